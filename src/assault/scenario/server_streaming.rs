use barrage_grpc_entity::benchmark_pb::SimpleResponse;
use tokio_util::sync::CancellationToken;
use tonic::{Status, Streaming};

use crate::assault::factory::RequestFactory;

use super::{cancellable, timed, BenchmarkClient, CallDriver, EstablishCall, Outcome};

/// Receives from one server stream opened for the whole lifetime of the driver.
#[derive(Debug)]
pub struct ServerStreamingDriver {
    responses: Streaming<SimpleResponse>,
}

impl EstablishCall for ServerStreamingDriver {
    async fn establish(
        mut client: BenchmarkClient,
        factory: RequestFactory,
        cancel: CancellationToken,
    ) -> Result<Self, Status> {
        let response = cancellable(&cancel, client.streaming_from_server(factory.produce())).await?;
        Ok(Self { responses: response.into_inner() })
    }
}

impl CallDriver for ServerStreamingDriver {
    async fn run_once(&mut self, cancel: &CancellationToken) -> Outcome {
        let (latency, received) = timed(cancellable(cancel, self.responses.message())).await;
        match received {
            Ok(Some(_)) => Outcome::Succeeded(latency),
            Ok(None) => Outcome::Terminated(latency, Status::aborted("server closed the stream")),
            Err(status) => Outcome::Terminated(latency, status),
        }
    }
}

#[cfg(test)]
mod tests {
    use barrage_dev_server_grpc::env::{Behavior, Env};
    use tonic::transport::Endpoint;

    use super::*;

    async fn client(behavior: Behavior) -> BenchmarkClient {
        let addr = barrage_dev_server_grpc::spawn_local(Env { behavior, ..Default::default() }).await.unwrap();
        BenchmarkClient::new(Endpoint::from_shared(format!("http://{addr}")).unwrap().connect().await.unwrap())
    }

    #[tokio::test]
    async fn test_server_streaming_receives() {
        let factory = RequestFactory::new(0, 64).unwrap();
        let mut driver =
            ServerStreamingDriver::establish(client(Behavior::Echo).await, factory, CancellationToken::new())
                .await
                .unwrap();
        for _ in 0..10 {
            assert!(matches!(driver.run_once(&CancellationToken::new()).await, Outcome::Succeeded(_)));
        }
    }

    #[tokio::test]
    async fn test_server_streaming_establishment_fails() {
        let status = ServerStreamingDriver::establish(
            client(Behavior::Reject).await,
            RequestFactory::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(status.code(), tonic::Code::Unavailable);
    }

    #[tokio::test]
    async fn test_server_streaming_cancelled_terminates() {
        let behavior = Behavior::Delay(std::time::Duration::from_secs(60));
        let mut driver =
            ServerStreamingDriver::establish(client(behavior).await, RequestFactory::default(), CancellationToken::new())
                .await
                .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(driver.run_once(&cancel).await, Outcome::Terminated(_, _)));
    }
}
