use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

const SCHEMES: [&str; 2] = ["http://", "https://"];

/// Target endpoint in `host:port` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    authority: String,
}
impl Destination {
    /// Remove `http://` or `https://` from the server address.
    pub fn new(addr: &str) -> Self {
        let stripped = SCHEMES.iter().find_map(|scheme| addr.strip_prefix(scheme)).unwrap_or(addr);
        Self { authority: stripped.trim_end_matches('/').to_string() }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// URI to dial, the scheme selects plaintext or TLS transport.
    pub fn uri(&self, secure: bool) -> String {
        let scheme = if secure { "https" } else { "http" };
        format!("{}://{}", scheme, self.authority)
    }
}
impl FromStr for Destination {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
impl Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.authority)
    }
}
