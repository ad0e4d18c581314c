//! # Arcadia Types
//!
//! Error definitions and configuration models for the Arcadia bot.
//!
//! This crate provides the foundational type system for the Arcadia workspace:
//!
//! - **`error`** - Typed error hierarchy for storage, external APIs, pooling and configuration
//! - **`models`** - Configuration models (limits, retry, HTTP, pool, logging, credentials)
//!
//! ## Architecture Role
//!
//! `arcadia-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!                arcadia-types (this crate)
//!                        │
//!                        ▼
//!                  arcadia-core
//!                        │
//!                        ▼
//!                   arcadia-bot
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for config files and structured logs
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ApiError, ConfigError, PoolError, Result, StorageError, TypedError};

// Re-export core model types
pub use models::{
    AiConfig, AiProvider, AppConfig, Credentials, HttpClientConfig, LogConfig, PoolConfig,
    RateLimitConfig, RetryConfig,
};
