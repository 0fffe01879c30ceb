pub mod ping_pong;
pub mod server_streaming;
pub mod unary;

use std::{fmt::Display, future::Future, str::FromStr, time::Duration};

use barrage_grpc_entity::benchmark_pb::benchmark_service_client::BenchmarkServiceClient;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::{transport::Channel, Status};

use crate::error::ConfigError;

use super::factory::RequestFactory;

pub type BenchmarkClient = BenchmarkServiceClient<Channel>;

/// Interaction pattern driven by every worker of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    #[default]
    Unary,
    ServerStreaming,
    PingPongStreaming,
}
impl FromStr for Scenario {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unary" => Ok(Self::Unary),
            "serverstreaming" => Ok(Self::ServerStreaming),
            "pingpongstreaming" => Ok(Self::PingPongStreaming),
            _ => Err(ConfigError::UnsupportedScenario(s.to_string())),
        }
    }
}
impl Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unary => write!(f, "unary"),
            Self::ServerStreaming => write!(f, "serverstreaming"),
            Self::PingPongStreaming => write!(f, "pingpongstreaming"),
        }
    }
}

/// Result of one iteration of a [`CallDriver`].
#[derive(Debug)]
pub enum Outcome {
    Succeeded(Duration),
    /// The driver can go on to the next iteration.
    Failed(Duration, Status),
    /// The driver cannot make any further call.
    Terminated(Duration, Status),
}

pub trait CallDriver: Send {
    fn run_once(&mut self, cancel: &CancellationToken) -> impl Future<Output = Outcome> + Send;
}

/// [`CallDriver`] set up over one connection of the pool.
pub trait EstablishCall: CallDriver + Sized {
    fn establish(
        client: BenchmarkClient,
        factory: RequestFactory,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Self, Status>> + Send;
}

/// Abort `call` when the run is cancelled.
pub async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T, Status>
where
    F: Future<Output = Result<T, Status>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Status::cancelled("benchmark has stopped")),
        result = call => result,
    }
}

pub async fn timed<T, F>(call: F) -> (Duration, T)
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let result = call.await;
    (start.elapsed(), result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scenario() {
        assert_eq!("unary".parse::<Scenario>().unwrap(), Scenario::Unary);
        assert_eq!("ServerStreaming".parse::<Scenario>().unwrap(), Scenario::ServerStreaming);
        assert_eq!("PINGPONGSTREAMING".parse::<Scenario>().unwrap(), Scenario::PingPongStreaming);
        assert!(matches!(
            "clientstreaming".parse::<Scenario>(),
            Err(ConfigError::UnsupportedScenario(s)) if s == "clientstreaming"
        ));

        for scenario in [Scenario::Unary, Scenario::ServerStreaming, Scenario::PingPongStreaming] {
            assert_eq!(scenario.to_string().parse::<Scenario>().unwrap(), scenario);
        }
    }

    #[tokio::test]
    async fn test_cancellable() {
        let cancel = CancellationToken::new();
        let ok = cancellable(&cancel, async { Ok::<_, Status>(1) }).await;
        assert_eq!(ok.unwrap(), 1);

        cancel.cancel();
        let err = cancellable(&cancel, std::future::pending::<Result<(), Status>>()).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed() {
        let (latency, value) = timed(async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            "done"
        })
        .await;
        assert_eq!(latency, Duration::from_millis(30));
        assert_eq!(value, "done");
    }
}
