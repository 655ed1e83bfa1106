//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent stream clients (0 = unlimited)
    pub max_connections: usize,

    /// Stats logging interval
    pub stats_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            stats_interval: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum concurrent stream clients
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set stats logging interval
    ///
    /// Intervals shorter than [`MIN_REPORT_INTERVAL`] are raised to it when
    /// the reporter starts.
    ///
    /// [`MIN_REPORT_INTERVAL`]: crate::stats::MIN_REPORT_INTERVAL
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }
}
