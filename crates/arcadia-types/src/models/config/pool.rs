//! Browser pool settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource pool bounds and browser launch options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on simultaneously created handles
    pub max_resources: usize,
    /// Handles created eagerly by `initialize()` (capped by `max_resources`)
    pub warm_count: usize,
    /// Initial wait for a free handle, in seconds
    pub acquire_timeout_secs: u64,
    /// Fail with a timeout instead of waiting indefinitely
    #[serde(default)]
    pub strict_timeout: bool,
    /// Browser executable used by the browser manager
    pub executable: String,
    /// Extra command-line flags passed to each browser process
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_resources: 2,
            warm_count: 2,
            acquire_timeout_secs: 30,
            strict_timeout: false,
            executable: "chromium".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}
