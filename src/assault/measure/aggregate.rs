use std::time::Duration;

use hdrhistogram::Histogram;

const SIGNIFICANT_FIGURES: u8 = 3;

pub trait Aggregator {
    type Add;
    type Aggregate;
    fn add(&mut self, add: &Self::Add);
    fn aggregate(&self) -> Self::Aggregate;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountAggregate {
    count: Count,
}
pub type Count = u64;
impl Aggregator for CountAggregate {
    type Add = ();
    type Aggregate = Count;
    fn add(&mut self, (): &Self::Add) {
        self.count += 1;
    }
    fn aggregate(&self) -> Self::Aggregate {
        self.count
    }
}
impl CountAggregate {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
    }
}

/// Running count, sum and max of latencies. With `detailed`, every sample also goes to a histogram.
#[derive(Debug, Clone)]
pub struct LatencyAggregate {
    count: Count,
    sum: Millis,
    max: Duration,
    hist: Option<Histogram<u64>>,
}
pub type Millis = f64;
pub type MeanLatency = Millis;
pub type MaxLatency = Duration;
impl Aggregator for LatencyAggregate {
    type Add = Duration;
    type Aggregate = (Count, MeanLatency, MaxLatency);
    fn add(&mut self, latency: &Self::Add) {
        self.count += 1;
        self.sum += millis(*latency);
        self.max = self.max.max(*latency);
        if let Some(hist) = &mut self.hist {
            let micros = latency.as_micros().try_into().unwrap_or(u64::MAX);
            // auto resizing only happens through `record`
            if let Err(e) = hist.record(micros) {
                tracing::warn!("cannot record latency {}us: {}", micros, e);
            }
        }
    }
    fn aggregate(&self) -> Self::Aggregate {
        (self.count(), self.mean(), self.max())
    }
}
impl LatencyAggregate {
    pub fn new(detailed: bool) -> Self {
        let hist = detailed
            .then(|| Histogram::new(SIGNIFICANT_FIGURES).unwrap_or_else(|e| unreachable!("{}", e)));
        Self { count: 0, sum: 0., max: Duration::ZERO, hist }
    }

    pub fn count(&self) -> Count {
        self.count
    }
    pub fn sum(&self) -> Millis {
        self.sum
    }
    pub fn mean(&self) -> MeanLatency {
        if self.count == 0 {
            0.
        } else {
            self.sum / self.count as f64
        }
    }
    pub fn max(&self) -> MaxLatency {
        self.max
    }
    /// Latency in milliseconds at `quantile`, only with detailed latency.
    pub fn value_at_quantile(&self, quantile: f64) -> Option<Millis> {
        let hist = self.hist.as_ref()?;
        Some(hist.value_at_quantile(quantile) as f64 / 1000.)
    }

    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.sum += other.sum;
        self.max = self.max.max(other.max);
        if let (Some(hist), Some(other)) = (&mut self.hist, &other.hist) {
            if let Err(e) = hist.add(other) {
                tracing::warn!("cannot merge latency histogram: {}", e);
            }
        }
    }
}

pub fn millis(duration: Duration) -> Millis {
    duration.as_secs_f64() * 1000.
}
