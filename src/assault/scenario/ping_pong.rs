use barrage_grpc_entity::benchmark_pb::{SimpleRequest, SimpleResponse};
use tokio::{sync::mpsc, time::Instant};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Status, Streaming};

use crate::assault::factory::RequestFactory;

use super::{cancellable, BenchmarkClient, CallDriver, EstablishCall, Outcome};

const REQUEST_BUFFER: usize = 1;

/// One request then one reply per iteration over a single bidirectional stream.
#[derive(Debug)]
pub struct PingPongDriver {
    factory: RequestFactory,
    requests: mpsc::Sender<SimpleRequest>,
    responses: Streaming<SimpleResponse>,
    in_flight: Option<Instant>,
}

impl EstablishCall for PingPongDriver {
    async fn establish(
        mut client: BenchmarkClient,
        factory: RequestFactory,
        cancel: CancellationToken,
    ) -> Result<Self, Status> {
        let (requests, rx) = mpsc::channel(REQUEST_BUFFER);

        // servers may hold the response headers back until the first message arrives
        requests.send(factory.produce()).await.map_err(|_| Status::internal("request stream is closed"))?;
        let response = cancellable(&cancel, client.streaming_call(ReceiverStream::new(rx))).await?;

        // the first sample excludes opening the stream
        Ok(Self { factory, requests, responses: response.into_inner(), in_flight: Some(Instant::now()) })
    }
}

impl CallDriver for PingPongDriver {
    async fn run_once(&mut self, cancel: &CancellationToken) -> Outcome {
        let start = match self.in_flight.take() {
            Some(start) => start,
            None => {
                let start = Instant::now();
                if let Err(status) = ping(&self.requests, self.factory.produce(), cancel).await {
                    return Outcome::Failed(start.elapsed(), status);
                }
                start
            }
        };

        match cancellable(cancel, self.responses.message()).await {
            Ok(Some(_)) => Outcome::Succeeded(start.elapsed()),
            Ok(None) => Outcome::Failed(start.elapsed(), Status::aborted("server closed the stream")),
            Err(status) => Outcome::Failed(start.elapsed(), status),
        }
    }
}

async fn ping(
    requests: &mpsc::Sender<SimpleRequest>,
    request: SimpleRequest,
    cancel: &CancellationToken,
) -> Result<(), Status> {
    let send = async { requests.send(request).await.map_err(|_| Status::unavailable("request stream is closed")) };
    cancellable(cancel, send).await
}
