//! Configuration related error types

use thiserror::Error;

/// Configuration errors detected before any remote call is made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {message}")]
    HttpClient { message: String },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an HTTP client error
    pub fn http_client(message: impl Into<String>) -> Self {
        Self::HttpClient {
            message: message.into(),
        }
    }
}
