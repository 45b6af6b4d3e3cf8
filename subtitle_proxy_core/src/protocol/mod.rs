//! OpenSubtitles XML-RPC protocol implementation
//!
//! This module implements the remote session protocol with a modular architecture:
//! - `transport`: HTTP transport behind the [`RemoteTransport`] seam
//! - `codec`: XML-RPC document encoding/decoding into [`Value`] trees
//! - `state`: session lifecycle state machine
//! - `rate_limit`: process-wide spacing of outbound calls
//! - `client`: session client with login, re-auth and rate limiting

pub mod client;
pub mod codec;
pub mod error;
pub mod rate_limit;
pub mod state;
pub mod transport;

// Re-export main types
pub use client::{SessionClient, SessionConfig, SessionInfo};
pub use codec::Value;
pub use error::{ProtocolError, Result, StatusCode};
pub use rate_limit::{RateLimiter, RatePermit};
pub use state::{SessionState, StateTransition};
pub use transport::{RemoteTransport, TransportConfig, XmlRpcTransport};

use std::time::Duration;

/// Default OpenSubtitles XML-RPC endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.opensubtitles.org/xml-rpc";

/// Default user agent sent with `LogIn` and every HTTP request
pub const DEFAULT_USER_AGENT: &str = "SubtitleAPI v1.0";

/// Default interface language for `LogIn`
pub const DEFAULT_LANGUAGE: &str = "en";

/// Minimum spacing between outbound calls
pub const MIN_CALL_INTERVAL: Duration = Duration::from_secs(1);

/// Token lifetime (15 minutes, the server's idle session timeout)
pub const SESSION_TTL: Duration = Duration::from_secs(900);
