//! Shared HTTP client settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts and connection bounds for the process-wide HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Whole-request timeout in seconds
    pub total_timeout_secs: u64,
    /// TCP/TLS connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Maximum requests in flight across all hosts
    pub max_connections: usize,
    /// Maximum requests in flight (and idle pooled connections) per host
    pub max_connections_per_host: usize,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            total_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_connections: 100,
            max_connections_per_host: 20,
            user_agent: format!("arcadia-bot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.total_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
