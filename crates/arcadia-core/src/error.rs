//! Unified error types for Arcadia Core.

use arcadia_types::{ApiError, ConfigError, PoolError, StorageError, TypedError};
use serde::Serialize;
use thiserror::Error;

/// Main error type for all Arcadia core operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Network request failed before a response arrived (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// External API answered with a failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration missing or invalid. Never retried.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Resource pool could not supply a handle.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// JSON store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Unclassified error with message.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Transient failures are the ones the retry engine re-invokes by default:
    /// connection problems, timeouts, 5xx/408 responses and upstream 429s.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Network(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            },
            AppError::Api(e) => e.is_transient(),
            AppError::Io(_)
            | AppError::Json(_)
            | AppError::Config(_)
            | AppError::Pool(_)
            | AppError::Storage(_)
            | AppError::Unknown(_) => false,
        }
    }

    /// Configuration failures get reported immediately with actionable text.
    pub fn is_config(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl From<TypedError> for AppError {
    fn from(e: TypedError) -> Self {
        match e {
            TypedError::Api(e) => AppError::Api(e),
            TypedError::Config(e) => AppError::Config(e),
            TypedError::Pool(e) => AppError::Pool(e),
            TypedError::Storage(e) => AppError::Storage(e),
        }
    }
}

/// Result type alias for Arcadia core operations.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_not_transient() {
        let err = AppError::from(ConfigError::missing("steam", "STEAM_API_KEY"));
        assert!(err.is_config());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_api_server_error_is_transient() {
        let err = AppError::from(ApiError::HttpStatus {
            provider: "steam".to_string(),
            status: 502,
            body: "bad gateway".to_string(),
        });
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "steam returned HTTP 502: bad gateway");
    }

    #[test]
    fn test_serializes_as_message() {
        let err = AppError::from(PoolError::Timeout { timeout_ms: 50 });
        let json = serde_json::to_string(&err).ok();
        assert_eq!(json.as_deref(), Some("\"No pooled resource available within 50ms\""));
    }
}
