//! Configuration loading.
//!
//! An optional JSON file supplies the structure, environment variables supply
//! credentials and a handful of overrides. Parse and validation failures are
//! returned as [`ConfigError`]s and never retried.

use std::fs;
use std::path::{Path, PathBuf};

use arcadia_types::{AiProvider, AppConfig, ConfigError};

use crate::modules::storage::JsonStore;
use crate::utils::paths::expand_home;

/// Default config file looked up when no path is given.
pub const CONFIG_FILE: &str = "arcadia.json";

/// Load configuration from `path` (or `./arcadia.json` if present) and the process environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) if !path.exists() => {
            return Err(ConfigError::NotFound { path: path.display().to_string() });
        },
        Some(path) => read_config_file(path)?,
        None if Path::new(CONFIG_FILE).exists() => read_config_file(Path::new(CONFIG_FILE))?,
        None => AppConfig::new(),
    };

    apply_env_overrides(&mut config, env);
    config.data_dir = expand_home(&config.data_dir);
    config.log.dir = expand_home(&config.log.dir);
    config.validate()?;

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))
}

/// Overlay environment variables onto `config`. Empty values count as unset.
pub fn apply_env_overrides<F>(config: &mut AppConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = var("DISCORD_TOKEN") {
        config.credentials.discord_token = Some(v);
    }
    if let Some(v) = var("STEAM_API_KEY") {
        config.credentials.steam_api_key = Some(v);
    }
    if let Some(v) = var("TWITCH_CLIENT_ID") {
        config.credentials.twitch_client_id = Some(v);
    }
    if let Some(v) = var("TWITCH_CLIENT_SECRET") {
        config.credentials.twitch_client_secret = Some(v);
    }
    if let Some(v) = var("RAWG_API_KEY") {
        config.credentials.rawg_api_key = Some(v);
    }
    if let Some(v) = var("ARCADIA_DATA_DIR") {
        config.data_dir = PathBuf::from(v);
    }
    if let Some(v) = var("LOG_LEVEL") {
        config.log.level = v.to_ascii_lowercase();
    }
    if let Some(v) = var("LOG_FILE") {
        config.log.file = v;
    }
    if let Some(v) = var("ENABLE_RSS_AUTO") {
        config.rss_auto = v.eq_ignore_ascii_case("true");
    }
    if let Some(v) = var("AI_ENABLED") {
        config.ai.enabled = v.eq_ignore_ascii_case("true");
    }
    if let Some(v) = var("AI_PROVIDER") {
        config.ai.provider = AiProvider::from_string(&v);
    }
    if let Some(v) = var("AI_MODEL") {
        config.ai.model = Some(v);
    }

    // The configured provider's key first, then any provider key that is present.
    let preferred = config.ai.provider.key_variable();
    config.ai.api_key = var(preferred)
        .or_else(|| var("GROQ_API_KEY"))
        .or_else(|| var("OPENAI_API_KEY"))
        .or_else(|| var("ANTHROPIC_API_KEY"))
        .or_else(|| config.ai.api_key.take());
}

/// Persist the non-secret part of `config` atomically.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    JsonStore::new()
        .try_save(config, path)
        .map_err(|e| ConfigError::WriteError { message: e.to_string() })
}
