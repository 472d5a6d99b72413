//! Server Configuration
//!
//! The startup contract of the event loop: where to listen, how often to
//! sweep expired keys, and how many connections to size the poller for.

use crate::server::ServerError;
use crate::storage::DEFAULT_SWEEP_INTERVAL;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// Default capacity hint for the poller (connections per poll round)
pub const DEFAULT_MAX_CONNECTIONS: usize = 20_000;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on (0 picks a free port)
    pub port: u16,
    /// Interval between expiry sweeps
    pub sweep_interval: Duration,
    /// Capacity hint for the readiness poller
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolves the bind address to the first matching socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let address = self.bind_address();
        let resolve_error = |source| ServerError::Resolve {
            address: address.clone(),
            source,
        };

        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(resolve_error)?
            .next()
            .ok_or_else(|| {
                resolve_error(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "no addresses found",
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert_eq!(config.max_connections, 20_000);
        assert_eq!(config.bind_address(), format!("127.0.0.1:{}", DEFAULT_PORT));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            port: 9000,
            ..Default::default()
        };
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_socket_addr_invalid_host() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ServerError::Resolve { .. })
        ));
    }
}
