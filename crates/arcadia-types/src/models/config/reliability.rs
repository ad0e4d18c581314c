//! Rate limit and retry settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Sliding-window limit: at most `max_calls` admissions per `period_ms`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum number of calls admitted inside one window
    pub max_calls: usize,
    /// Window length in milliseconds
    pub period_ms: u64,
}

impl RateLimitConfig {
    pub const fn new(max_calls: usize, period_ms: u64) -> Self {
        Self { max_calls, period_ms }
    }

    /// Steam Web API: 100 calls per minute.
    pub const fn steam() -> Self {
        Self::new(100, 60_000)
    }

    /// IGDB: 4 calls per second.
    pub const fn igdb() -> Self {
        Self::new(4, 1_000)
    }

    /// Discord REST: 50 calls per second.
    pub const fn discord() -> Self {
        Self::new(50, 1_000)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.max_calls == 0 {
            return Err(ConfigError::invalid(
                &format!("rate_limits.{name}.max_calls"),
                "must be positive",
            ));
        }
        if self.period_ms == 0 {
            return Err(ConfigError::invalid(
                &format!("rate_limits.{name}.period_ms"),
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Exponential backoff parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Growth factor applied per attempt
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 1_000, max_delay_ms: 60_000, exponential_base: 2.0 }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.base_delay_ms == 0 {
            return Err(ConfigError::invalid("retry.base_delay_ms", "must be positive"));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::invalid(
                "retry.max_delay_ms",
                "must be greater than or equal to base_delay_ms",
            ));
        }
        if self.exponential_base.is_nan() || self.exponential_base <= 1.0 {
            return Err(ConfigError::invalid("retry.exponential_base", "must be greater than 1"));
        }
        Ok(())
    }
}
