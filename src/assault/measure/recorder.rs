use std::{sync::Arc, time::Duration};

use tonic::Status;

use crate::assault::{
    phase::{PhaseWatch, RunPhase},
    worker::RunContext,
};

use super::accumulator::ConnectionStats;

/// Records the samples of one connection according to the current phase.
/// Successes count only while measuring, failures count from the end of warmup until the stop.
#[derive(Debug, Clone)]
pub struct Recorder {
    context: Arc<RunContext>,
    connection: usize,
}
impl Recorder {
    pub fn new(context: Arc<RunContext>, connection: usize) -> Self {
        Self { context, connection }
    }

    pub fn connection(&self) -> usize {
        self.connection
    }
    pub fn phase(&self) -> &PhaseWatch {
        self.context.phase()
    }

    /// Returns whether the sample was counted.
    pub fn success(&self, latency: Duration) -> bool {
        if !self.phase().is_measuring() {
            return false;
        }
        self.stats().record_success(latency);
        self.context.max_latency().observe(latency);
        true
    }

    /// Returns whether the failure was counted.
    pub fn failure(&self, latency: Option<Duration>, status: &Status) -> bool {
        match self.phase().phase() {
            RunPhase::WarmingUp => false,
            RunPhase::Stopped => {
                tracing::debug!(connection = self.connection, %status, "failure after the stop is not counted");
                false
            }
            RunPhase::Measuring => {
                self.stats().record_failure(latency);
                if let Some(latency) = latency {
                    self.context.max_latency().observe(latency);
                }
                true
            }
        }
    }

    fn stats(&self) -> &ConnectionStats {
        &self.context.stats()[self.connection]
    }
}
