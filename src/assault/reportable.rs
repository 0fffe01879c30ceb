use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interface::report::job_statistics::{JobMetadata, JobStatistics, Operation};

use super::{
    measure::{
        accumulator::ConnectionStats,
        aggregate::{millis, Aggregator, Count, LatencyAggregate, Millis},
    },
    worker::RunContext,
};

pub const PERCENTILES: [u8; 4] = [50, 75, 90, 99];

/// Statistics of a whole run, reduced from every connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub requests_per_connection: Vec<Count>,
    pub failures_per_connection: Vec<Count>,
    pub requests: Count,
    pub failures: Count,
    pub least_requests: Count,
    pub most_requests: Count,
    pub rps: f64,
    pub latency_count: Count,
    pub mean_latency: Millis,
    pub max_latency: Millis,
    pub percentiles: Vec<(u8, Millis)>,
}
impl Summary {
    /// Every worker must have finished.
    pub fn reduce(context: &RunContext, duration: Duration) -> Self {
        let snapshots: Vec<_> = context.stats().iter().map(ConnectionStats::snapshot).collect();
        let requests_per_connection: Vec<_> = snapshots.iter().map(|s| s.requests.aggregate()).collect();
        let failures_per_connection: Vec<_> = snapshots.iter().map(|s| s.failures.aggregate()).collect();

        let mut latency = LatencyAggregate::new(context.detailed_latency());
        for snapshot in &snapshots {
            latency.merge(&snapshot.latency);
        }

        let requests: Count = requests_per_connection.iter().sum();
        let rps = if duration.is_zero() { 0. } else { requests as f64 / duration.as_secs_f64() };
        let percentiles = PERCENTILES
            .iter()
            .filter_map(|&p| Some((p, latency.value_at_quantile(f64::from(p) / 100.)?)))
            .collect();

        Self {
            least_requests: requests_per_connection.iter().copied().min().unwrap_or_default(),
            most_requests: requests_per_connection.iter().copied().max().unwrap_or_default(),
            failures: failures_per_connection.iter().sum(),
            requests,
            requests_per_connection,
            failures_per_connection,
            rps,
            latency_count: latency.count(),
            mean_latency: latency.mean(),
            max_latency: millis(context.max_latency().get()),
            percentiles,
        }
    }

    pub fn throughput_statistics(&self, timestamp: DateTime<Utc>) -> JobStatistics {
        JobStatistics::new()
            .measure(
                JobMetadata::new("grpc/rps/max", "Max RPS", "RPS: max")
                    .operations(Operation::Max, Operation::Sum)
                    .format("n0"),
                self.rps,
                timestamp,
            )
            .measure(
                JobMetadata::new("grpc/requests", "Requests", "Total number of requests")
                    .operations(Operation::Max, Operation::Sum)
                    .format("n0"),
                self.requests as f64,
                timestamp,
            )
            .measure(
                JobMetadata::new("grpc/errors/badresponses", "Bad responses", "Non-2xx or 3xx responses")
                    .operations(Operation::Max, Operation::Sum)
                    .format("n0"),
                self.failures as f64,
                timestamp,
            )
            .measure(
                JobMetadata::new(
                    "grpc/requests/connection/min",
                    "Least requests per connection",
                    "Requests of the connection with the least requests",
                )
                .operations(Operation::Min, Operation::Min)
                .format("n0"),
                self.least_requests as f64,
                timestamp,
            )
            .measure(
                JobMetadata::new(
                    "grpc/requests/connection/max",
                    "Most requests per connection",
                    "Requests of the connection with the most requests",
                )
                .operations(Operation::Max, Operation::Max)
                .format("n0"),
                self.most_requests as f64,
                timestamp,
            )
    }

    pub fn latency_statistics(&self, timestamp: DateTime<Utc>) -> JobStatistics {
        let statistics = JobStatistics::new()
            .measure(
                JobMetadata::new("grpc/latency/mean", "Mean latency (ms)", "Mean latency (ms)")
                    .operations(Operation::Max, Operation::Avg)
                    .format("n2"),
                self.mean_latency,
                timestamp,
            )
            .measure(
                JobMetadata::new("grpc/latency/max", "Max latency (ms)", "Max latency (ms)")
                    .operations(Operation::Max, Operation::Max)
                    .format("n2"),
                self.max_latency,
                timestamp,
            );
        self.percentiles.iter().fold(statistics, |statistics, &(p, value)| {
            let name = format!("grpc/latency/{p}");
            let description = format!("{p}th percentile latency (ms)");
            let metadata = JobMetadata::new(&name, &description, &description)
                .operations(Operation::Max, Operation::Max)
                .format("n2");
            statistics.measure(metadata, value, timestamp)
        })
    }
}
