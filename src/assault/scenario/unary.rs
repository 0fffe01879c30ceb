use tokio_util::sync::CancellationToken;
use tonic::Status;

use crate::assault::factory::RequestFactory;

use super::{cancellable, timed, BenchmarkClient, CallDriver, EstablishCall, Outcome};

/// One unary call per iteration, a failure does not stop the driver.
#[derive(Debug, Clone)]
pub struct UnaryDriver {
    client: BenchmarkClient,
    factory: RequestFactory,
}

impl EstablishCall for UnaryDriver {
    async fn establish(
        client: BenchmarkClient,
        factory: RequestFactory,
        _cancel: CancellationToken,
    ) -> Result<Self, Status> {
        Ok(Self { client, factory })
    }
}

impl CallDriver for UnaryDriver {
    async fn run_once(&mut self, cancel: &CancellationToken) -> Outcome {
        let request = self.factory.produce();
        let (latency, response) = timed(cancellable(cancel, self.client.unary_call(request))).await;
        match response {
            Ok(_) => Outcome::Succeeded(latency),
            Err(status) => Outcome::Failed(latency, status),
        }
    }
}
