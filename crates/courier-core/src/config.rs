//! Centralized configuration for Courier.
//!
//! Default values live as associated constants on [`RpcDefaults`]; the server
//! and client endpoints take [`ServerConfig`] and [`ClientConfig`].

use crate::{CourierError, Result};
use std::time::Duration;

/// Default values shared by the server and client endpoints.
pub struct RpcDefaults;

impl RpcDefaults {
    pub const VERSION: &'static str = "v1";
    pub const PORT: u16 = 9999;
    pub const SERVER_HOST: &'static str = "0.0.0.0";
    pub const CLIENT_HOST: &'static str = "localhost";
    pub const WORKER_POOL_SIZE: usize = 64;
    pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);
    pub const CALL_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MAX_IDLE_PER_HOST: usize = 64;
    pub const INTERNAL_ERROR_MESSAGE: &'static str = "internal server error";
}

/// Server endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on (0 = auto-assign)
    pub port: u16,
    /// Maximum number of requests processed concurrently
    pub worker_pool_size: usize,
    /// Deadline for a single dispatch
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: RpcDefaults::SERVER_HOST.to_string(),
            port: RpcDefaults::PORT,
            worker_pool_size: RpcDefaults::WORKER_POOL_SIZE,
            request_timeout: RpcDefaults::REQUEST_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.worker_pool_size == 0 {
            return Err(CourierError::Config {
                message: "worker_pool_size must be at least 1".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(CourierError::Config {
                message: "request_timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port` string used for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Client endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Default wait bound for a single call
    pub timeout: Duration,
    /// Idle pooled connections kept per host
    pub max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: RpcDefaults::CLIENT_HOST.to_string(),
            port: RpcDefaults::PORT,
            timeout: RpcDefaults::CALL_TIMEOUT,
            max_idle_per_host: RpcDefaults::MAX_IDLE_PER_HOST,
        }
    }
}

impl ClientConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.port, 9999);
        assert_eq!(server.worker_pool_size, 64);
        assert_eq!(server.request_timeout, Duration::from_millis(5000));

        let client = ClientConfig::default();
        assert_eq!(client.host, "localhost");
        assert_eq!(client.port, 9999);
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.base_url(), "http://localhost:9999");
    }

    #[test]
    fn test_server_config_validation() {
        assert!(ServerConfig::default().validate().is_ok());
        assert!(ServerConfig::default()
            .with_worker_pool_size(0)
            .validate()
            .is_err());
        assert!(ServerConfig::default()
            .with_request_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_bind_address() {
        let cfg = ServerConfig::default().with_host("127.0.0.1").with_port(0);
        assert_eq!(cfg.bind_address(), "127.0.0.1:0");
    }
}
