//! Resource pool errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the resource pool.
///
/// Contention alone never produces an error; only failures to create a handle or
/// derive a session escalate to the caller.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum PoolError {
    /// The resource manager failed to create a new handle
    #[error("Failed to create pooled resource: {message}")]
    CreationFailed { message: String },

    /// Deriving an isolated session from a handle failed
    #[error("Failed to create session: {message}")]
    SessionFailed { message: String },

    /// Strict acquisition did not obtain a handle in time
    #[error("No pooled resource available within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}
