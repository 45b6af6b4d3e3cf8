//! Protocol-specific error types
//!
//! This module defines error types for the remote XML-RPC session protocol.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol-specific error types
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// HTTP transport failure (connection refused, DNS, TLS, non-2xx status)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Remote call did not complete in time
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    /// Encoding error
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Decoding error
    #[error("Decoding error: {message}")]
    Decoding { message: String },

    /// XML-RPC fault returned by the server
    #[error("Remote fault {code}: {message}")]
    Fault { code: i64, message: String },

    /// Server answered with a non-success status line
    #[error("Remote server error: {code} - {message}")]
    ServerError { code: u16, message: String },

    /// Login was rejected or could not be performed
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// Token was rejected by the server
    #[error("Invalid session: {reason}")]
    InvalidSession { reason: String },

    /// Not logged in
    #[error("Not logged in to the remote endpoint")]
    NotLoggedIn,

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Invalid response format
    #[error("Invalid response format: expected {expected}, got {actual}")]
    InvalidResponse { expected: String, actual: String },
}

impl ProtocolError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a decoding error
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Create a fault error
    pub fn fault(code: i64, message: impl Into<String>) -> Self {
        Self::Fault {
            code,
            message: message.into(),
        }
    }

    /// Create a server error
    pub fn server_error(code: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
        }
    }

    /// Create an authentication failed error
    pub fn authentication_failed(reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid session error
    pub fn invalid_session(reason: impl Into<String>) -> Self {
        Self::InvalidSession {
            reason: reason.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidResponse {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Check if this error is transient (network-level, worth trying later)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Timeout(_)
                | Self::ServerError {
                    code: 429 | 500..=599,
                    ..
                }
        )
    }

    /// Check if this error indicates a need to re-authenticate
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Self::InvalidSession { .. }
                | Self::NotLoggedIn
                | Self::ServerError {
                    code: 401 | 406,
                    ..
                }
        )
    }
}

impl From<reqwest::Error> for ProtocolError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}

/// Status code embedded in every remote response (`"200 OK"`, `"406 No session"`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// Parse the numeric prefix of a status line such as `"200 OK"`
    pub fn parse(status: &str) -> Option<Self> {
        status
            .split_whitespace()
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .map(StatusCode)
    }

    /// Check if the status indicates success
    pub fn is_success(&self) -> bool {
        matches!(self.0, 200..=299)
    }

    /// Check if the status means the session token is no longer accepted
    pub fn is_session_invalid(&self) -> bool {
        matches!(self.0, 401 | 406)
    }

    /// Check if the status indicates a server-side failure
    pub fn is_server_error(&self) -> bool {
        matches!(self.0, 500..=599)
    }

    /// Get a human-readable description of the status code
    pub fn description(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            206 => "PARTIAL CONTENT",
            301 => "MOVED",
            401 => "UNAUTHORIZED",
            402 => "SUBTITLES HAVE INVALID FORMAT",
            403 => "SUBHASHES DO NOT MATCH",
            404 => "SUBTITLES HAVE INVALID LANGUAGE",
            405 => "NOT ALL MANDATORY PARAMETERS SPECIFIED",
            406 => "NO SESSION",
            407 => "DOWNLOAD LIMIT REACHED",
            408 => "INVALID PARAMETERS",
            409 => "METHOD NOT FOUND",
            410 => "OTHER OR UNKNOWN ERROR",
            411 => "EMPTY OR INVALID USER AGENT",
            412 => "INVALID FORMAT",
            414 => "UNKNOWN USER AGENT",
            415 => "DISABLED USER AGENT",
            429 => "TOO MANY REQUESTS",
            503 => "SERVICE UNAVAILABLE",
            506 => "SERVER UNDER MAINTENANCE",
            _ => "UNKNOWN STATUS CODE",
        }
    }

    /// Convert a non-success status into the matching protocol error
    pub fn into_error(self, status_line: &str) -> ProtocolError {
        if self.is_session_invalid() {
            ProtocolError::invalid_session(status_line)
        } else {
            ProtocolError::server_error(self.0, status_line)
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.description())
    }
}
