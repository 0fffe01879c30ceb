use std::path::PathBuf;

use thiserror::Error;

pub type BarrageResult<T, E = BarrageError> = Result<T, E>;

#[derive(Error, Debug)]
#[error(transparent)]
pub enum BarrageError {
    ConfigError(#[from] ConfigError),
    PayloadError(#[from] PayloadError),
    ConnectionError(#[from] ConnectionError),
    ReportError(#[from] ReportError),

    JoinError(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ca_file required with TLS")]
    MissingCaFile,
    #[error("cannot read CA file `{}`: {}", .0.display(), .1)]
    UnreadableCaFile(PathBuf, #[source] std::io::Error),
    #[error("TLS is requested but the `tls` feature is disabled")]
    TlsDisabled,

    #[error("unsupported scenario: {0}")]
    UnsupportedScenario(String),
    #[error("`{0}` should be at least 1")]
    Zero(&'static str),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PayloadError {
    #[error("requested an invalid length {0}")]
    InvalidLength(i32),
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("`{0}` is not a valid endpoint: {1}")]
    InvalidEndpoint(String, #[source] tonic::transport::Error),
    #[error("fail to configure TLS: {0}")]
    Tls(#[source] tonic::transport::Error),
    #[error("fail to dial connection {index} to {endpoint}: {source}")]
    Dial {
        index: usize,
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to create JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
