//! Storage-related errors.
//!
//! The public store API degrades to defaults / `false`; these errors describe
//! what went wrong in the logs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur inside the JSON file store.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("IO error on {path}: {message}")]
    Io { path: String, message: String },

    /// Value could not be encoded or decoded
    #[error("JSON error on {path}: {message}")]
    Json { path: String, message: String },

    /// Blocking worker panicked or was cancelled
    #[error("Storage task failed: {message}")]
    Task { message: String },
}

impl StorageError {
    /// Build an IO error for a path.
    pub fn io(path: &std::path::Path, e: &std::io::Error) -> Self {
        Self::Io { path: path.display().to_string(), message: e.to_string() }
    }

    /// Build a JSON error for a path.
    pub fn json(path: &std::path::Path, e: &serde_json::Error) -> Self {
        Self::Json { path: path.display().to_string(), message: e.to_string() }
    }
}
