//! Error types for the subtitle proxy core library
//!
//! Each layer has its own error enum; [`Error`] wraps them for callers that
//! drive the whole stack.

use thiserror::Error;

pub mod config;
pub mod service;

pub use self::config::ConfigError;
pub use self::service::ServiceError;
pub use crate::protocol::ProtocolError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the subtitle proxy core library
#[derive(Error, Debug)]
pub enum Error {
    /// Remote protocol errors
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Subtitle service errors
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// The service-level view of this error, if it has one
    pub fn as_service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_errors_are_transparent() {
        let error: Error = ServiceError::not_found("subtitle 12345").into();
        assert_eq!(error.to_string(), "Not found: subtitle 12345");
        assert!(error.as_service_error().is_some());

        let error: Error = ProtocolError::NotLoggedIn.into();
        assert!(error.to_string().contains("Not logged in"));
        assert!(error.as_service_error().is_none());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + StdError>() {}
        assert_send_sync::<Error>();
    }
}
