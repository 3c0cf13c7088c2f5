//! Server configuration types
//!
//! Defines the main configuration structures for the proxy.

use super::TcpConfig;
use crate::error::ProxyError;
use crate::socks::{DEFAULT_BUFFER_SIZE, DEFAULT_CONNECT_TIMEOUT_SECS, MIN_BUFFER_SIZE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default listen address, all interfaces on port 10800
fn default_listen_addr() -> String {
    "0.0.0.0:10800".to_string()
}

/// Default destination connect timeout in seconds
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Default relay chunk size
fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// SOCKS5 server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address to accept SOCKS5 clients on (e.g. "127.0.0.1:1080")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Destination connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Relay chunk size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            connect_timeout: default_connect_timeout(),
            buffer_size: default_buffer_size(),
            tcp: TcpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Destination connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Listen address in a form the listener can bind
    ///
    /// A bare `:port` means all interfaces. Host names are resolved at bind
    /// time.
    pub fn bind_addr(&self) -> String {
        match self.listen_addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port),
            None => self.listen_addr.clone(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ProxyError> {
        let invalid = |reason: &str| {
            ProxyError::Config(format!(
                "Invalid listen address {}: {}",
                self.listen_addr, reason
            ))
        };

        let (_, port) = self
            .listen_addr
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;
        port.parse::<u16>().map_err(|_| invalid("invalid port"))?;

        if self.connect_timeout == 0 {
            return Err(ProxyError::Config(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }

        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(ProxyError::Config(format!(
                "buffer_size must be at least {} bytes",
                MIN_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}
