use std::time::Duration;

use super::{connection::Security, destination::Destination, factory::RequestFactory, scenario::Scenario};

/// Everything a run needs, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub destination: Destination,
    pub security: Security,
    pub scenario: Scenario,
    pub factory: RequestFactory,
    pub connections: usize,
    pub streams: usize,
    pub warmup: Duration,
    pub duration: Duration,
    pub detailed_latency: bool,
    pub connect_timeout: Option<Duration>,
}
impl Default for Plan {
    fn default() -> Self {
        Self {
            destination: Destination::new("localhost:5000"),
            security: Security::Plaintext,
            scenario: Scenario::Unary,
            factory: RequestFactory::default(),
            connections: 1,
            streams: 1,
            warmup: Duration::from_secs(5),
            duration: Duration::from_secs(10),
            detailed_latency: false,
            connect_timeout: None,
        }
    }
}
impl Plan {
    pub fn workers(&self) -> usize {
        self.connections * self.streams
    }
}
