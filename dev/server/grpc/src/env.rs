use std::{str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Env {
    pub listen: String,
    pub port: String,
    pub behavior: Behavior,
}
impl Default for Env {
    fn default() -> Self {
        Self { listen: "0.0.0.0".to_string(), port: "5000".to_string(), behavior: Behavior::default() }
    }
}
impl Env {
    pub fn environment(default: Self) -> Result<Self, BehaviorError> {
        Ok(Self {
            listen: std::env::var("LISTEN").unwrap_or(default.listen),
            port: std::env::var("PORT").unwrap_or(default.port),
            behavior: match std::env::var("BEHAVIOR") {
                Ok(b) => b.parse()?,
                Err(_) => default.behavior,
            },
        })
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }
}

/// How the benchmark service answers calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Behavior {
    /// answer every call with a payload of the requested size
    #[default]
    Echo,

    /// like [`Behavior::Echo`], but wait before each response
    Delay(Duration),

    /// fail every unary call and every stream establishment with `UNAVAILABLE`
    Reject,
}
impl FromStr for Behavior {
    type Err = BehaviorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s.eq_ignore_ascii_case("echo") => Ok(Self::Echo),
            None if s.eq_ignore_ascii_case("reject") => Ok(Self::Reject),
            Some((delay, millis)) if delay.eq_ignore_ascii_case("delay") => {
                let millis = millis.parse().map_err(|_| BehaviorError::InvalidDelay(millis.to_string()))?;
                Ok(Self::Delay(Duration::from_millis(millis)))
            }
            _ => Err(BehaviorError::Unknown(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BehaviorError {
    #[error("`{0}` is not a behavior, expected one of `echo`, `reject`, `delay:<millis>`")]
    Unknown(String),
    #[error("`{0}` is not a delay in milliseconds")]
    InvalidDelay(String),
}
