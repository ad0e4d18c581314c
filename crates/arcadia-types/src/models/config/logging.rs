//! Logging settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how verbosely the bot logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Directory holding the rolling log files
    pub dir: PathBuf,
    /// Main log file name (rotated daily)
    pub file: String,
    /// Also write an errors-only log
    #[serde(default = "default_true")]
    pub error_file: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: PathBuf::from("logs"),
            file: "bot.log".to_string(),
            error_file: true,
        }
    }
}
