use barrage_grpc_entity::benchmark_pb::benchmark_service_server::BenchmarkServiceServer;
use tonic::transport::{server::Router, Server};
use tonic_health::{pb::health_server::HealthServer, server::HealthService};
use tower::layer::util::Identity;

use crate::env::Env;

pub mod benchmark;

pub async fn app(env: Env) -> Router<Identity> {
    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter.set_serving::<HealthServer<HealthService>>().await;
    health_reporter.set_serving::<BenchmarkServiceServer<benchmark::BenchmarkImpl>>().await;

    router(env).add_service(health_service)
}
pub fn router(env: Env) -> Router<Identity> {
    let Env { behavior, .. } = env;

    Server::builder()
        .trace_fn(|_| tracing::info_span!(env!("CARGO_PKG_NAME")))
        .add_service(BenchmarkServiceServer::new(benchmark::BenchmarkImpl::new(behavior)))
}
