//! External API errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by calls to external HTTP APIs (Steam, IGDB, RAWG, LLM providers).
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum ApiError {
    /// Connection-level failure (DNS, reset, TLS)
    #[error("Network error talking to {provider}: {message}")]
    Network { provider: String, message: String },

    /// Upstream answered with a non-success status
    #[error("{provider} returned HTTP {status}: {body}")]
    HttpStatus { provider: String, status: u16, body: String },

    /// Upstream answered 429
    #[error("Rate limited by {provider}{}", retry_after_secs.map(|s| format!(", retry after {}s", s)).unwrap_or_default())]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Response body could not be decoded
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Request exceeded the client timeout
    #[error("Request to {provider} timed out")]
    Timeout { provider: String },
}

impl ApiError {
    /// Whether the failure is worth retrying.
    ///
    /// 4xx responses other than 408/429 are permanent; decoding failures are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 408,
            Self::InvalidResponse { .. } => false,
        }
    }

    /// Provider name the error originated from.
    pub fn provider(&self) -> &str {
        match self {
            Self::Network { provider, .. }
            | Self::HttpStatus { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::InvalidResponse { provider, .. }
            | Self::Timeout { provider } => provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let server = ApiError::HttpStatus {
            provider: "steam".to_string(),
            status: 503,
            body: String::new(),
        };
        let not_found = ApiError::HttpStatus {
            provider: "steam".to_string(),
            status: 404,
            body: String::new(),
        };
        let limited = ApiError::RateLimited { provider: "igdb".to_string(), retry_after_secs: None };

        assert!(server.is_transient());
        assert!(!not_found.is_transient());
        assert!(limited.is_transient());
    }

    #[test]
    fn test_provider_accessor() {
        let err = ApiError::Timeout { provider: "rawg".to_string() };
        assert_eq!(err.provider(), "rawg");
    }
}
