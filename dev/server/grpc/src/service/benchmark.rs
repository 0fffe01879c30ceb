use barrage_grpc_entity::benchmark_pb::{
    benchmark_service_server::BenchmarkService, Payload, SimpleRequest, SimpleResponse,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use crate::env::Behavior;

const STREAM_BUFFER: usize = 128;

#[derive(Debug, Clone, Default)]
pub struct BenchmarkImpl {
    pub behavior: Behavior,
}

#[tonic::async_trait]
impl BenchmarkService for BenchmarkImpl {
    #[tracing::instrument(level = "trace", ret)]
    async fn unary_call(&self, request: Request<SimpleRequest>) -> Result<Response<SimpleResponse>, Status> {
        self.admit()?;
        self.pause().await;
        Ok(Response::new(Self::respond(request.get_ref())?))
    }

    type StreamingCallStream = ReceiverStream<Result<SimpleResponse, Status>>;
    #[tracing::instrument(level = "trace", skip_all)]
    async fn streaming_call(
        &self,
        request: Request<Streaming<SimpleRequest>>,
    ) -> Result<Response<Self::StreamingCallStream>, Status> {
        self.admit()?;
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let service = self.clone();
        tokio::spawn(async move {
            loop {
                let reply = match inbound.message().await {
                    Ok(Some(request)) => {
                        service.pause().await;
                        Self::respond(&request)
                    }
                    Ok(None) => break,
                    Err(status) => Err(status),
                };
                let failed = reply.is_err();
                if tx.send(reply).await.is_err() || failed {
                    break;
                }
            }
        });
        Ok(Response::new(ReceiverStream::new(rx)))
    }

    type StreamingFromServerStream = ReceiverStream<Result<SimpleResponse, Status>>;
    #[tracing::instrument(level = "trace", skip_all)]
    async fn streaming_from_server(
        &self,
        request: Request<SimpleRequest>,
    ) -> Result<Response<Self::StreamingFromServerStream>, Status> {
        self.admit()?;
        let response = Self::respond(request.get_ref())?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let service = self.clone();
        tokio::spawn(async move {
            loop {
                service.pause().await;
                if tx.send(Ok(response.clone())).await.is_err() {
                    break; // client has gone
                }
            }
        });
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

impl BenchmarkImpl {
    pub fn new(behavior: Behavior) -> Self {
        Self { behavior }
    }

    pub fn respond(request: &SimpleRequest) -> Result<SimpleResponse, Status> {
        let size = usize::try_from(request.response_size).map_err(|_| {
            Status::invalid_argument(format!("requested a response with invalid length {}", request.response_size))
        })?;
        Ok(SimpleResponse { payload: Some(Payload::zeroed(size)) })
    }

    fn admit(&self) -> Result<(), Status> {
        match self.behavior {
            Behavior::Reject => Err(Status::unavailable("dev server rejects every call")),
            Behavior::Echo | Behavior::Delay(_) => Ok(()),
        }
    }

    async fn pause(&self) {
        if let Behavior::Delay(delay) = self.behavior {
            tokio::time::sleep(delay).await;
        }
    }
}
