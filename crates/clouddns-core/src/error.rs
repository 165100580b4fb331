//! Error types for the dynamic Cloud DNS system
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for reconciliation and publishing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Managed zone errors (listing or change submission)
    #[error("Zone error: {0}")]
    Zone(String),

    /// Container registry / image tooling errors
    #[error("Registry error: {0}")]
    Registry(String),

    /// Secret lookup errors
    #[error("Secret error: {0}")]
    Secret(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (sockets, subprocesses)
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Zone, record or secret not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Adapter-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Adapter name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a zone error
    pub fn zone(msg: impl Into<String>) -> Self {
        Self::Zone(msg.into())
    }

    /// Create a registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a secret error
    pub fn secret(msg: impl Into<String>) -> Self {
        Self::Secret(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an adapter-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Best-effort message for surfacing to remote callers
    ///
    /// Strips the variant prefix for adapter errors so the caller sees the
    /// message the external service produced.
    pub fn public_message(&self) -> String {
        match self {
            Error::Provider { message, .. } => message.clone(),
            Error::Zone(msg)
            | Error::Registry(msg)
            | Error::Secret(msg)
            | Error::Http(msg)
            | Error::NotFound(msg)
            | Error::InvalidInput(msg)
            | Error::Other(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_message_strips_provider_prefix() {
        let err = Error::provider("cloud_dns", "Zone not found: home");
        assert_eq!(err.public_message(), "Zone not found: home");
        assert_eq!(err.to_string(), "Provider error (cloud_dns): Zone not found: home");
    }

    #[test]
    fn test_public_message_keeps_config_prefix() {
        let err = Error::config("ZONE is required");
        assert_eq!(err.public_message(), "Configuration error: ZONE is required");
    }
}
