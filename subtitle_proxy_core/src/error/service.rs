//! Caller-facing service error types

use crate::format::FetchError;
use crate::protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the subtitle service
///
/// Rate limiting never appears here: it is absorbed by waiting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Bad credentials, or the remote rejected a re-login
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// Network failure, timeout, remote error status or undecodable payload
    #[error("Upstream unavailable: {reason}")]
    UpstreamUnavailable { reason: String },

    /// The remote has no data for the request
    #[error("Not found: {what}")]
    NotFound { what: String },
}

impl ServiceError {
    /// Create an upstream unavailable error
    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Stable machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed { .. } => "authentication_failed",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::NotFound { .. } => "not_found",
        }
    }
}

impl From<ProtocolError> for ServiceError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::AuthenticationFailed { reason } => Self::AuthenticationFailed { reason },
            other => Self::upstream(other.to_string()),
        }
    }
}

impl From<FetchError> for ServiceError {
    fn from(err: FetchError) -> Self {
        Self::upstream(err.to_string())
    }
}
