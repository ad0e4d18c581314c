//! Configuration-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during configuration operations.
///
/// These are persistent failures: they are surfaced to the caller immediately and
/// never fed into the retry engine.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// An explicitly requested `arcadia.json` does not exist
    #[error("Config file {path} does not exist")]
    NotFound {
        path: String,
    },

    /// `arcadia.json` is not valid JSON or does not match the model
    #[error("Invalid config file: {message}")]
    ParseError {
        message: String,
    },

    /// A limit, delay or pool size is out of range
    #[error("Invalid value for {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field, e.g. `retry.max_attempts`
        field: String,
        message: String,
    },

    /// A credential required by a provider is not set
    #[error("{provider} is not configured: set {variable}")]
    MissingCredential {
        /// Provider that needs the credential
        provider: String,
        /// Environment variable that supplies it
        variable: String,
    },

    /// Saving the config or creating the log directory failed
    #[error("Could not write config: {message}")]
    WriteError {
        message: String,
    },
}

impl ConfigError {
    /// Malformed JSON.
    pub fn from_json_error(e: &serde_json::Error) -> Self {
        Self::ParseError { message: e.to_string() }
    }

    /// Filesystem failure while writing.
    pub fn from_io_error(e: &std::io::Error) -> Self {
        Self::WriteError { message: e.to_string() }
    }

    /// Shorthand for a missing credential.
    pub fn missing(provider: &str, variable: &str) -> Self {
        Self::MissingCredential { provider: provider.to_string(), variable: variable.to_string() }
    }

    /// Shorthand for a validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::ValidationError { field: field.to_string(), message: message.into() }
    }
}
