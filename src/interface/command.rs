use std::{io::Write, path::PathBuf, time::Duration};

use chrono::Utc;
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::{
    assault::{
        connection::Security, destination::Destination, factory::RequestFactory, plan::Plan, reportable::Summary,
        worker::Control,
    },
    error::{BarrageResult, ConfigError, ReportError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", clap(version, about))]
pub struct Barrage {
    /// `h2` uses TLS, anything else is plaintext
    #[cfg_attr(feature = "cli", arg(long, default_value = "h2c"))]
    pub protocol: String,

    /// CA certificate, required with TLS
    #[cfg_attr(feature = "cli", arg(long = "ca_file", alias = "ca-file"))]
    pub ca_file: Option<PathBuf>,

    /// server to benchmark
    #[cfg_attr(feature = "cli", arg(long = "server_addr", alias = "server-addr", default_value = "localhost:5000"))]
    pub server_addr: String,

    /// server name used to verify the certificate
    #[cfg_attr(
        feature = "cli",
        arg(long = "server_host_override", alias = "server-host-override", default_value = "x.test.youtube.com")
    )]
    pub server_host_override: String,

    /// `unary`, `serverstreaming` or `pingpongstreaming`
    #[cfg_attr(feature = "cli", arg(long, default_value = "unary"))]
    pub scenario: String,

    /// payload bytes of each request
    #[cfg_attr(
        feature = "cli",
        arg(long = "request_size", alias = "request-size", default_value_t = 0, allow_negative_numbers = true)
    )]
    pub request_size: i32,

    /// payload bytes requested to each response
    #[cfg_attr(
        feature = "cli",
        arg(long = "response_size", alias = "response-size", default_value_t = 0, allow_negative_numbers = true)
    )]
    pub response_size: i32,

    /// number of connections
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 1))]
    pub connections: usize,

    /// number of concurrent streams per connection
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 1))]
    pub streams: usize,

    /// seconds before measuring
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 5))]
    pub warmup: u64,

    /// seconds of measuring
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 10))]
    pub duration: u64,

    /// also report latency percentiles
    #[cfg_attr(feature = "cli", arg(long))]
    pub latency: bool,

    /// seconds to wait for each connection
    #[cfg_attr(feature = "cli", arg(long = "connect_timeout", alias = "connect-timeout"))]
    pub connect_timeout: Option<u64>,

    /// log filter, `RUST_LOG` takes precedence
    #[cfg_attr(feature = "cli", arg(long = "log_level", alias = "log-level", default_value = "info"))]
    pub log_level: String,
}
impl Default for Barrage {
    fn default() -> Self {
        Self {
            protocol: "h2c".to_string(),
            ca_file: None,
            server_addr: "localhost:5000".to_string(),
            server_host_override: "x.test.youtube.com".to_string(),
            scenario: "unary".to_string(),
            request_size: 0,
            response_size: 0,
            connections: 1,
            streams: 1,
            warmup: 5,
            duration: 10,
            latency: false,
            connect_timeout: None,
            log_level: "info".to_string(),
        }
    }
}

impl Barrage {
    #[cfg(feature = "cli")]
    pub fn parse_cli() -> Self {
        Self::parse()
    }

    /// Validate the arguments, nothing is dialed yet.
    pub fn plan(&self) -> BarrageResult<Plan> {
        let Self {
            protocol,
            ca_file,
            server_addr,
            server_host_override,
            scenario,
            request_size,
            response_size,
            connections,
            streams,
            warmup,
            duration,
            latency,
            connect_timeout,
            ..
        } = self;
        if *connections == 0 {
            return Err(ConfigError::Zero("connections").into());
        }
        if *streams == 0 {
            return Err(ConfigError::Zero("streams").into());
        }

        Ok(Plan {
            destination: Destination::new(server_addr),
            security: Security::from_protocol(protocol, ca_file.as_deref(), server_host_override)?,
            scenario: scenario.parse()?,
            factory: RequestFactory::new(*request_size, *response_size)?,
            connections: *connections,
            streams: *streams,
            warmup: Duration::from_secs(*warmup),
            duration: Duration::from_secs(*duration),
            detailed_latency: *latency,
            connect_timeout: connect_timeout.map(Duration::from_secs),
        })
    }

    /// Install the global subscriber writing to stderr, does nothing if one is already installed.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let _ = tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter).try_init();
    }

    #[cfg(feature = "cli")]
    pub async fn execute(&self) -> std::process::ExitCode {
        self.init_tracing();
        match self.run(std::io::stdout()).await {
            Ok(_) => std::process::ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("{}", e);
                std::process::ExitCode::FAILURE
            }
        }
    }

    /// Run the benchmark and write both statistics blocks to `write`.
    pub async fn run<W: Write>(&self, write: W) -> BarrageResult<Summary> {
        tracing::info!("gRPC Client");
        match serde_json::to_string(self) {
            Ok(args) => tracing::info!("Args: {}", args),
            Err(e) => tracing::warn!("cannot serialize args: {}", e),
        }

        let control = Control::new(self.plan()?);
        let summary = control.assault().await?;
        self.report_with(&summary, write)?;
        Ok(summary)
    }

    pub fn report_with<W: Write>(&self, summary: &Summary, mut write: W) -> Result<(), ReportError> {
        tracing::info!("Least Requests per Connection: {}", summary.least_requests);
        tracing::info!("Most Requests per Connection: {}", summary.most_requests);
        tracing::info!("RPS {}", summary.rps);
        summary.throughput_statistics(Utc::now()).write(&mut write)?;

        tracing::info!("Average latency {}ms", summary.mean_latency);
        summary.latency_statistics(Utc::now()).write(&mut write)?;
        write.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::{
        assault::scenario::Scenario,
        error::{BarrageError, PayloadError},
        interface::report::job_statistics::JobStatistics,
    };

    use super::*;

    #[test]
    #[cfg(feature = "cli")]
    fn test_default_args() {
        match Barrage::try_parse_from(["barrage"]) {
            Ok(cmd) => assert_eq!(cmd, Barrage::default()),
            Err(e) => panic!("every argument has default value: {e}"),
        };
    }

    #[test]
    #[cfg(feature = "cli")]
    fn test_parse_args() {
        let cmd = Barrage::try_parse_from([
            "barrage",
            "--protocol",
            "h2",
            "--ca_file",
            "certs/ca.crt",
            "--server_addr",
            "http://localhost:5001/",
            "--scenario",
            "PingPongStreaming",
            "--request_size",
            "64",
            "--response-size",
            "128",
            "--connections",
            "4",
            "--streams",
            "8",
            "--warmup",
            "0",
            "--latency",
        ])
        .unwrap();
        assert_eq!(
            cmd,
            Barrage {
                protocol: "h2".to_string(),
                ca_file: Some(PathBuf::from("certs/ca.crt")),
                server_addr: "http://localhost:5001/".to_string(),
                scenario: "PingPongStreaming".to_string(),
                request_size: 64,
                response_size: 128,
                connections: 4,
                streams: 8,
                warmup: 0,
                latency: true,
                ..Default::default()
            }
        );

        let plan = cmd.plan().unwrap();
        assert_eq!(plan.destination, Destination::new("localhost:5001"));
        assert_eq!(
            plan.security,
            Security::Tls { ca_file: Path::new("certs/ca.crt").to_path_buf(), server_host_override: "x.test.youtube.com".into() }
        );
        assert_eq!(plan.scenario, Scenario::PingPongStreaming);
        assert_eq!(plan.factory.request_size(), 64);
        assert_eq!(plan.workers(), 32);
        assert_eq!(plan.warmup, Duration::ZERO);
        assert_eq!(plan.duration, Duration::from_secs(10));
        assert!(plan.detailed_latency);
    }

    #[test]
    #[cfg(feature = "cli")]
    fn test_parse_negative_size() {
        let cmd = Barrage::try_parse_from(["barrage", "--request_size", "-1"]).unwrap();
        assert!(matches!(cmd.plan(), Err(BarrageError::PayloadError(PayloadError::InvalidLength(-1)))));
    }

    #[test]
    fn test_invalid_plan() {
        let tls_without_ca = Barrage { protocol: "h2".to_string(), ..Default::default() };
        assert!(matches!(tls_without_ca.plan(), Err(BarrageError::ConfigError(ConfigError::MissingCaFile))));

        let unknown_scenario = Barrage { scenario: "clientstreaming".to_string(), ..Default::default() };
        assert!(matches!(
            unknown_scenario.plan(),
            Err(BarrageError::ConfigError(ConfigError::UnsupportedScenario(_)))
        ));

        let negative_response = Barrage { response_size: -8, ..Default::default() };
        assert!(matches!(negative_response.plan(), Err(BarrageError::PayloadError(PayloadError::InvalidLength(-8)))));

        let no_connection = Barrage { connections: 0, ..Default::default() };
        assert!(matches!(no_connection.plan(), Err(BarrageError::ConfigError(ConfigError::Zero("connections")))));
        let no_stream = Barrage { streams: 0, ..Default::default() };
        assert!(matches!(no_stream.plan(), Err(BarrageError::ConfigError(ConfigError::Zero("streams")))));
    }

    #[test]
    fn test_report_with() {
        let summary = Summary {
            requests_per_connection: vec![10, 30],
            failures_per_connection: vec![1, 0],
            requests: 40,
            failures: 1,
            least_requests: 10,
            most_requests: 30,
            rps: 4.,
            latency_count: 41,
            mean_latency: 1.5,
            max_latency: 9.,
            percentiles: vec![],
        };
        let mut buf = Vec::new();
        Barrage::default().report_with(&summary, &mut buf).unwrap();

        let output = String::from_utf8(buf).unwrap();
        let statistics = JobStatistics::extract(&output).unwrap();
        assert_eq!(statistics.len(), 2);
        let values: Vec<_> = statistics[0].measurements.iter().map(|m| m.value).collect();
        assert_eq!(values, [4., 40., 1., 10., 30.]);
        let values: Vec<_> = statistics[1].measurements.iter().map(|m| m.value).collect();
        assert_eq!(values, [1.5, 9.]);
    }
}
