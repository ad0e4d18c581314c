//! Configuration models for Arcadia.
//!
//! This module contains the shared configuration structures used across the workspace.

mod config;

// Re-export all models
pub use config::{
    AiConfig, AiProvider, AppConfig, Credentials, HttpClientConfig, LogConfig, PoolConfig,
    RateLimitConfig, RetryConfig, DISCORD_LIMITER, IGDB_LIMITER, STEAM_LIMITER,
};
