//! Reachability check for the server under test.
//!
//! Run once before any suite so an absent server is a single configuration error
//! instead of a failure in every test.

use crate::config::{ConfigError, HarnessConfig};
use reqwest::Url;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::task::JoinError;

/// Timeout for the TCP connect probe.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A server whose collection endpoint accepted a TCP connection.
#[derive(Debug, Clone)]
pub struct ServerConnection {
    pub base_url: String,
    pub addr: SocketAddr,
}

impl ServerConnection {
    /// Probe the host and port of `config.base_url`.
    pub async fn connect(config: &HarnessConfig) -> Result<Self, ConfigError> {
        let base_url = config.base_url.clone();
        tokio::task::spawn_blocking(move || Self::connect_blocking(base_url))
            .await
            .map_err(probe_failed)?
    }

    fn connect_blocking(base_url: String) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: base_url.clone(),
            reason,
        };

        let url = Url::parse(&base_url).map_err(|e| invalid(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port".to_string()))?;

        let unreachable = || ConfigError::Unreachable {
            host: host.clone(),
            port,
        };

        let addrs = (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|_| unreachable())?;

        for addr in addrs {
            if TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok() {
                return Ok(Self {
                    base_url: base_url.clone(),
                    addr,
                });
            }
        }

        Err(unreachable())
    }
}

fn probe_failed(err: JoinError) -> ConfigError {
    ConfigError::ProbeFailed(err.to_string())
}
