use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReportError;

pub const START_MARKER: &str = "#StartJobStatistics";
pub const END_MARKER: &str = "#EndJobStatistics";
pub const SOURCE: &str = "Benchmarks";

/// How the benchmark harness combines values of the same metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Avg,
    Sum,
    Max,
    Min,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobMetadata {
    pub source: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<Operation>,
    pub short_description: String,
    pub long_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}
impl JobMetadata {
    pub fn new(name: &str, short_description: &str, long_description: &str) -> Self {
        Self {
            source: SOURCE.to_string(),
            name: name.to_string(),
            aggregate: None,
            reduce: None,
            short_description: short_description.to_string(),
            long_description: long_description.to_string(),
            format: None,
        }
    }

    pub fn operations(self, aggregate: Operation, reduce: Operation) -> Self {
        Self { aggregate: Some(aggregate), reduce: Some(reduce), ..self }
    }

    pub fn format(self, format: &str) -> Self {
        Self { format: Some(format.to_string()), ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobMeasurement {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub value: f64,
}

/// One block of statistics read by the benchmark harness.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobStatistics {
    pub metadata: Vec<JobMetadata>,
    pub measurements: Vec<JobMeasurement>,
}
impl JobStatistics {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn measure(mut self, metadata: JobMetadata, value: f64, timestamp: DateTime<Utc>) -> Self {
        self.measurements.push(JobMeasurement { timestamp, name: metadata.name.clone(), value });
        self.metadata.push(metadata);
        self
    }

    /// Write the JSON between the start and end markers, so it can be found in the middle of other outputs.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), ReportError> {
        let json = serde_json::to_string(self)?;
        writeln!(w, "{}", START_MARKER)?;
        writeln!(w, "{}", json)?;
        writeln!(w, "{}", END_MARKER)?;
        Ok(())
    }

    /// Find every block written by [`JobStatistics::write`] in `output`.
    pub fn extract(output: &str) -> Result<Vec<Self>, ReportError> {
        let mut statistics = Vec::new();
        let mut lines = output.lines();
        while lines.by_ref().any(|line| line == START_MARKER) {
            let json: Vec<_> = lines.by_ref().take_while(|line| *line != END_MARKER).collect();
            statistics.push(serde_json::from_str(&json.join("\n"))?);
        }
        Ok(statistics)
    }
}
