use std::{future::Future, sync::Arc};

use tokio_util::sync::CancellationToken;
use tonic::{transport::Channel, Status};

use crate::error::BarrageResult;

use super::{
    connection::ConnectionPool,
    measure::{
        accumulator::{ConnectionStats, MaxLatency},
        recorder::Recorder,
    },
    phase::{PhaseController, PhaseWatch},
    plan::Plan,
    reportable::Summary,
    scenario::{
        ping_pong::PingPongDriver, server_streaming::ServerStreamingDriver, unary::UnaryDriver, BenchmarkClient,
        CallDriver, EstablishCall, Outcome, Scenario,
    },
};

/// State shared by every worker of a run.
#[derive(Debug)]
pub struct RunContext {
    stats: Vec<ConnectionStats>,
    max_latency: MaxLatency,
    detailed_latency: bool,
    phase: PhaseWatch,
}
impl RunContext {
    pub fn new(connections: usize, detailed_latency: bool, phase: PhaseWatch) -> Self {
        let stats = (0..connections).map(|_| ConnectionStats::new(detailed_latency)).collect();
        Self { stats, max_latency: MaxLatency::new(), detailed_latency, phase }
    }

    pub fn recorder(self: &Arc<Self>, connection: usize) -> Recorder {
        Recorder::new(self.clone(), connection)
    }

    pub fn stats(&self) -> &[ConnectionStats] {
        &self.stats
    }
    pub fn max_latency(&self) -> &MaxLatency {
        &self.max_latency
    }
    pub fn detailed_latency(&self) -> bool {
        self.detailed_latency
    }
    pub fn phase(&self) -> &PhaseWatch {
        &self.phase
    }
}

/// Runs a whole [`Plan`] and reduces it into a [`Summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    plan: Plan,
}
impl Control {
    pub fn new(plan: Plan) -> Self {
        Self { plan }
    }
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub async fn assault(&self) -> BarrageResult<Summary> {
        let Plan { destination, security, connections, connect_timeout, .. } = &self.plan;
        let pool = ConnectionPool::connect(destination, *connections, security, *connect_timeout).await?;
        let channels = pool.into_channels();
        tracing::info!("Built {} connections", channels.len());
        match self.plan.scenario {
            Scenario::Unary => self.assault_scenario::<UnaryDriver>(channels).await,
            Scenario::ServerStreaming => self.assault_scenario::<ServerStreamingDriver>(channels).await,
            Scenario::PingPongStreaming => self.assault_scenario::<PingPongDriver>(channels).await,
        }
    }

    async fn assault_scenario<D>(&self, channels: Vec<Channel>) -> BarrageResult<Summary>
    where
        D: EstablishCall + 'static,
    {
        let factory = self.plan.factory.clone();
        self.assault_with(move |connection, _stream, cancel| {
            D::establish(BenchmarkClient::new(channels[connection].clone()), factory.clone(), cancel)
        })
        .await
    }

    /// Spawn one worker per `(connection, stream)`, each driving the call returned by `establish`.
    pub async fn assault_with<D, F, Fut>(&self, establish: F) -> BarrageResult<Summary>
    where
        D: CallDriver + 'static,
        F: Fn(usize, usize, CancellationToken) -> Fut,
        Fut: Future<Output = Result<D, Status>> + Send + 'static,
    {
        let Plan { connections, streams, warmup, duration, detailed_latency, .. } = self.plan;
        let controller = PhaseController::new(warmup, duration);
        let context = Arc::new(RunContext::new(connections, detailed_latency, controller.watch()));
        let timer = controller.spawn();

        tracing::info!("Starting {} workers", self.plan.workers());
        let workers: Vec<_> = (0..connections)
            .flat_map(|connection| (0..streams).map(move |stream| (connection, stream)))
            .map(|(connection, stream)| {
                let call = establish(connection, stream, context.phase().cancellation().clone());
                tokio::spawn(Worker::new(context.recorder(connection), stream).run(call))
            })
            .collect();
        let joined = futures::future::join_all(workers).await;
        timer.abort();
        joined.into_iter().collect::<Result<Vec<_>, _>>()?;

        Ok(Summary::reduce(&context, duration))
    }
}

/// Drives the calls of one stream of one connection until the run stops.
#[derive(Debug, Clone)]
pub struct Worker {
    recorder: Recorder,
    stream: usize,
}
impl Worker {
    pub fn new(recorder: Recorder, stream: usize) -> Self {
        Self { recorder, stream }
    }

    pub async fn run<D, F>(self, establish: F)
    where
        D: CallDriver,
        F: Future<Output = Result<D, Status>>,
    {
        let Self { recorder, stream } = self;
        let connection = recorder.connection();
        let phase = recorder.phase().clone();
        tracing::debug!("Starting {} {}", connection, stream);

        match establish.await {
            Ok(mut driver) => loop {
                match driver.run_once(phase.cancellation()).await {
                    Outcome::Succeeded(latency) => {
                        recorder.success(latency);
                    }
                    Outcome::Failed(latency, status) => {
                        recorder.failure(Some(latency), &status);
                        tokio::task::yield_now().await;
                    }
                    Outcome::Terminated(latency, status) => {
                        recorder.failure(Some(latency), &status);
                        break;
                    }
                }
                if phase.is_stopped() {
                    break;
                }
            },
            Err(status) => {
                tracing::debug!(connection, stream, %status, "fail to establish the call");
                phase.warmup_finished().await;
                recorder.failure(None, &status);
            }
        }

        tracing::debug!("Finished {} {}", connection, stream);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU64, Ordering},
        time::Duration,
    };

    use crate::assault::measure::aggregate::Aggregator;

    use super::*;

    /// Succeeds after `delay` on every call, counting the calls it made.
    struct SleepDriver {
        delay: Duration,
        calls: Arc<AtomicU64>,
    }
    impl CallDriver for SleepDriver {
        async fn run_once(&mut self, cancel: &CancellationToken) -> Outcome {
            let start = tokio::time::Instant::now();
            tokio::select! {
                _ = cancel.cancelled() => Outcome::Failed(start.elapsed(), Status::cancelled("stopped")),
                _ = tokio::time::sleep(self.delay) => {
                    self.calls.fetch_add(1, Ordering::Relaxed);
                    Outcome::Succeeded(start.elapsed())
                }
            }
        }
    }

    /// Fails after `delay` on every call.
    struct FailingDriver {
        delay: Duration,
    }
    impl CallDriver for FailingDriver {
        async fn run_once(&mut self, _cancel: &CancellationToken) -> Outcome {
            tokio::time::sleep(self.delay).await;
            Outcome::Failed(self.delay, Status::unavailable("failing"))
        }
    }

    fn plan(connections: usize, streams: usize, warmup: u64, duration: u64) -> Plan {
        Plan {
            connections,
            streams,
            warmup: Duration::from_secs(warmup),
            duration: Duration::from_secs(duration),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sample_during_warmup() {
        let sleep = |_: usize, _: usize, _: CancellationToken| async {
            Ok::<_, Status>(SleepDriver { delay: Duration::from_millis(7), calls: Default::default() })
        };

        let warmed = Control::new(plan(1, 1, 3, 0)).assault_with(sleep).await.unwrap();
        assert_eq!(warmed.requests, 0);
        assert_eq!(warmed.latency_count, 0);
        assert_eq!(warmed.rps, 0.);

        let measured = Control::new(plan(1, 1, 0, 3)).assault_with(sleep).await.unwrap();
        assert_eq!(measured.requests, 428);
        assert_eq!(measured.failures, 0);
        assert_eq!(measured.latency_count, 428);
        assert!((measured.mean_latency - 7.).abs() < 1e-6);
        assert!((measured.max_latency - 7.).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_calls_independent_of_layout() {
        let sleep = |_: usize, _: usize, _: CancellationToken| async {
            Ok::<_, Status>(SleepDriver { delay: Duration::from_millis(7), calls: Default::default() })
        };

        let mut totals = Vec::new();
        for (connections, streams) in [(1, 4), (4, 1), (2, 2)] {
            let summary = Control::new(plan(connections, streams, 0, 3)).assault_with(sleep).await.unwrap();
            assert_eq!(summary.requests_per_connection.len(), connections);
            totals.push(summary.requests + summary.failures);
        }
        assert_eq!(totals, [4 * 428; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_per_connection() {
        // connection i takes (i + 1) * 7ms per call
        let calls: Vec<_> = (0..3).map(|_| Arc::new(AtomicU64::new(0))).collect();
        let summary = Control::new(plan(3, 2, 0, 1))
            .assault_with(|connection, _, _| {
                let calls = calls[connection].clone();
                let delay = Duration::from_millis((connection as u64 + 1) * 7);
                async move { Ok::<_, Status>(SleepDriver { delay, calls }) }
            })
            .await
            .unwrap();

        assert_eq!(summary.requests_per_connection, vec![284, 142, 94]);
        assert_eq!(summary.least_requests, 94);
        assert_eq!(summary.most_requests, 284);
        assert_eq!(summary.requests, summary.requests_per_connection.iter().sum::<u64>());
        assert_eq!(summary.rps, summary.requests as f64);
        for (counted, made) in summary.requests_per_connection.iter().zip(&calls) {
            assert!(*counted <= made.load(Ordering::Relaxed));
        }
        assert!((summary.max_latency - 21.).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_establishment_failure_recorded_once_after_warmup() {
        let controller = PhaseController::new(Duration::from_secs(2), Duration::from_secs(5));
        let context = Arc::new(RunContext::new(1, false, controller.watch()));
        controller.spawn();

        let start = tokio::time::Instant::now();
        let failed = async { Err::<SleepDriver, _>(Status::unavailable("refused")) };
        Worker::new(context.recorder(0), 0).run(failed).await;

        assert_eq!(start.elapsed(), Duration::from_secs(2));
        let stats = context.stats()[0].snapshot();
        assert_eq!(stats.failures.aggregate(), 1);
        assert_eq!(stats.requests.aggregate(), 0);
        // no timing sample for an establishment failure
        assert_eq!(stats.latency.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_failure_carries_timing() {
        let summary = Control::new(plan(1, 1, 0, 1))
            .assault_with(|_, _, _| async { Ok::<_, Status>(FailingDriver { delay: Duration::from_millis(90) }) })
            .await
            .unwrap();
        assert_eq!(summary.requests, 0);
        assert_eq!(summary.failures, 11);
        assert_eq!(summary.latency_count, 11);
        assert!((summary.mean_latency - 90.).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_success_after_stop() {
        let controller = PhaseController::new(Duration::ZERO, Duration::from_secs(1));
        let context = Arc::new(RunContext::new(1, false, controller.watch()));
        controller.spawn();

        let calls = Arc::new(AtomicU64::new(0));
        let driver = SleepDriver { delay: Duration::from_millis(300), calls: calls.clone() };
        Worker::new(context.recorder(0), 0).run(async { Ok(driver) }).await;

        let recorded = context.stats()[0].snapshot().requests.aggregate();
        assert_eq!(recorded, 3);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert!(!context.recorder(0).success(Duration::from_millis(1)));
        assert_eq!(context.stats()[0].snapshot().requests.aggregate(), recorded);
    }
}
