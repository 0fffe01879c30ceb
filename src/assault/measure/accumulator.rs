use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use super::aggregate::{Aggregator, CountAggregate, LatencyAggregate};

/// Counters of one connection.
#[derive(Debug, Clone)]
pub struct StatAccumulator {
    pub requests: CountAggregate,
    pub failures: CountAggregate,
    pub latency: LatencyAggregate,
}
impl StatAccumulator {
    pub fn new(detailed: bool) -> Self {
        Self { requests: CountAggregate::new(), failures: CountAggregate::new(), latency: LatencyAggregate::new(detailed) }
    }

    pub fn succeed(&mut self, latency: Duration) {
        self.requests.add(&());
        self.latency.add(&latency);
    }

    pub fn fail(&mut self, latency: Option<Duration>) {
        self.failures.add(&());
        if let Some(latency) = latency {
            self.latency.add(&latency);
        }
    }
}

/// [`StatAccumulator`] shared by the workers of one connection.
#[derive(Debug)]
pub struct ConnectionStats {
    accumulator: Mutex<StatAccumulator>,
}
impl ConnectionStats {
    pub fn new(detailed: bool) -> Self {
        Self { accumulator: Mutex::new(StatAccumulator::new(detailed)) }
    }

    pub fn record_success(&self, latency: Duration) {
        self.lock().succeed(latency)
    }
    pub fn record_failure(&self, latency: Option<Duration>) {
        self.lock().fail(latency)
    }

    pub fn snapshot(&self) -> StatAccumulator {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, StatAccumulator> {
        // counters stay consistent even if a holder panicked
        self.accumulator.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Largest latency observed by any worker of a run.
#[derive(Debug, Default)]
pub struct MaxLatency {
    nanos: AtomicU64,
}
impl MaxLatency {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn observe(&self, latency: Duration) {
        let nanos = latency.as_nanos().try_into().unwrap_or(u64::MAX);
        self.nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    pub fn get(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}
