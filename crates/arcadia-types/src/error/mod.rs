//! Typed error definitions for Arcadia.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for structured logs via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for retry and reporting logic via enum variants
//! - **Composable** via thiserror derive macros

mod api;
mod config;
mod pool;
mod storage;

pub use api::ApiError;
pub use config::ConfigError;
pub use pool::PoolError;
pub use storage::StorageError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
///
/// Use this when you need a single error type that can represent
/// any Arcadia error.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps an external API error
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Wraps a resource pool error
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Wraps a storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TypedError {
    /// Whether retrying the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(e) => e.is_transient(),
            Self::Config(_) | Self::Pool(_) | Self::Storage(_) => false,
        }
    }
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;
