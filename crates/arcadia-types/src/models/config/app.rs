//! Application-level configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::ai::AiConfig;
use super::http::HttpClientConfig;
use super::logging::LogConfig;
use super::pool::PoolConfig;
use super::reliability::{RateLimitConfig, RetryConfig};
use crate::error::ConfigError;

/// Names of the limiters every deployment gets.
pub const STEAM_LIMITER: &str = "steam";
pub const IGDB_LIMITER: &str = "igdb";
pub const DISCORD_LIMITER: &str = "discord";

/// Secrets supplied through the environment. Never written back to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    #[serde(default, skip_serializing)]
    pub discord_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub steam_api_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub twitch_client_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub twitch_client_secret: Option<String>,
    #[serde(default, skip_serializing)]
    pub rawg_api_key: Option<String>,
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding every JSON document
    pub data_dir: PathBuf,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub http: HttpClientConfig,
    #[serde(default)]
    pub browser_pool: PoolConfig,
    /// Named sliding-window limits, one per external resource
    #[serde(default = "default_rate_limits")]
    pub rate_limits: HashMap<String, RateLimitConfig>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub ai: AiConfig,
    /// Poll RSS feeds automatically
    #[serde(default = "default_true")]
    pub rss_auto: bool,
    #[serde(default, skip_serializing)]
    pub credentials: Credentials,
}

fn default_true() -> bool {
    true
}

fn default_rate_limits() -> HashMap<String, RateLimitConfig> {
    HashMap::from([
        (STEAM_LIMITER.to_string(), RateLimitConfig::steam()),
        (IGDB_LIMITER.to_string(), RateLimitConfig::igdb()),
        (DISCORD_LIMITER.to_string(), RateLimitConfig::discord()),
    ])
}

impl AppConfig {
    /// Create default configuration.
    pub fn new() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log: LogConfig::default(),
            http: HttpClientConfig::default(),
            browser_pool: PoolConfig::default(),
            rate_limits: default_rate_limits(),
            retry: RetryConfig::default(),
            ai: AiConfig::default(),
            rss_auto: true,
            credentials: Credentials::default(),
        }
    }

    /// Check numeric parameters. Runs before any service is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, limit) in &self.rate_limits {
            limit.validate(name)?;
        }
        self.retry.validate()?;
        if self.browser_pool.max_resources == 0 {
            return Err(ConfigError::invalid("browser_pool.max_resources", "must be positive"));
        }
        if self.http.max_connections == 0 || self.http.max_connections_per_host == 0 {
            return Err(ConfigError::invalid("http", "connection limits must be positive"));
        }
        Ok(())
    }

    /// Credentials the bot cannot start without.
    pub fn validate_required(&self) -> Result<(), ConfigError> {
        match self.credentials.discord_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(()),
            _ => Err(ConfigError::missing("discord", "DISCORD_TOKEN")),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_include_named_limiters() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.rate_limits[STEAM_LIMITER], RateLimitConfig::steam());
        assert_eq!(cfg.rate_limits[IGDB_LIMITER].max_calls, 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_discord_token() {
        let cfg = AppConfig::default();
        assert_eq!(
            cfg.validate_required(),
            Err(ConfigError::missing("discord", "DISCORD_TOKEN"))
        );
    }

    #[test]
    fn test_credentials_are_not_serialized() {
        let mut cfg = AppConfig::default();
        cfg.credentials.steam_api_key = Some("secret".to_string());
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"data_dir":"state"}"#).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("state"));
        assert_eq!(cfg.browser_pool.max_resources, 2);
        assert_eq!(cfg.rate_limits.len(), 3);
    }
}
