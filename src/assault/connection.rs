use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
#[cfg(feature = "tls")]
use tonic::transport::{Certificate, ClientTlsConfig};
use tonic::transport::{Channel, Endpoint};

use crate::error::{BarrageResult, ConfigError, ConnectionError};

use super::destination::Destination;

/// Transport security applied to every connection of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Security {
    Plaintext,
    Tls { ca_file: PathBuf, server_host_override: String },
}
impl Security {
    /// `h2` uses TLS and requires a CA file, anything else is plain TCP.
    pub fn from_protocol(
        protocol: &str,
        ca_file: Option<&Path>,
        server_host_override: &str,
    ) -> Result<Self, ConfigError> {
        if protocol != "h2" {
            return Ok(Self::Plaintext);
        }
        match ca_file.filter(|path| !path.as_os_str().is_empty()) {
            Some(ca_file) => {
                Ok(Self::Tls { ca_file: ca_file.to_path_buf(), server_host_override: server_host_override.to_string() })
            }
            None => Err(ConfigError::MissingCaFile),
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, Self::Tls { .. })
    }

    async fn configure(&self, endpoint: Endpoint) -> BarrageResult<Endpoint> {
        match self {
            Self::Plaintext => Ok(endpoint),
            #[cfg(feature = "tls")]
            Self::Tls { ca_file, server_host_override } => {
                let pem = tokio::fs::read(ca_file)
                    .await
                    .map_err(|e| ConfigError::UnreadableCaFile(ca_file.clone(), e))?;
                let tls = ClientTlsConfig::new()
                    .ca_certificate(Certificate::from_pem(pem))
                    .domain_name(server_host_override.clone());
                Ok(endpoint.tls_config(tls).map_err(ConnectionError::Tls)?)
            }
            #[cfg(not(feature = "tls"))]
            Self::Tls { .. } => Err(ConfigError::TlsDisabled.into()),
        }
    }
}

/// Independently dialed connections to one destination.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    connections: Vec<Channel>,
}
impl ConnectionPool {
    /// Dial `count` connections one by one, any failure fails the whole pool.
    pub async fn connect(
        destination: &Destination,
        count: usize,
        security: &Security,
        connect_timeout: Option<Duration>,
    ) -> BarrageResult<Self> {
        let uri = destination.uri(security.is_secure());
        let mut endpoint =
            Endpoint::from_shared(uri.clone()).map_err(|e| ConnectionError::InvalidEndpoint(uri.clone(), e))?;
        if let Some(timeout) = connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        let endpoint = security.configure(endpoint).await?;

        tracing::info!("Building connections to {}", destination);
        let mut connections = Vec::with_capacity(count);
        for index in 0..count {
            let channel = endpoint
                .connect()
                .await
                .map_err(|source| ConnectionError::Dial { index, endpoint: uri.clone(), source })?;
            connections.push(channel);
        }
        Ok(Self { connections })
    }

    pub fn into_channels(self) -> Vec<Channel> {
        self.connections
    }
}
