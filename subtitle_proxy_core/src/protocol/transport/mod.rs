//! Transport layer for remote procedure calls
//!
//! This module defines the [`RemoteTransport`] seam between the session client
//! and the wire. The production implementation speaks XML-RPC over HTTP;
//! tests substitute scripted transports.

mod http;

pub use http::XmlRpcTransport;

use crate::protocol::codec::Value;
use crate::protocol::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Transport layer configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Endpoint URL
    pub endpoint: String,
    /// User agent sent with every request
    pub user_agent: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::protocol::DEFAULT_ENDPOINT.to_string(),
            user_agent: crate::protocol::DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// A single remote-procedure invocation channel
///
/// Implementations perform exactly one request per `invoke` and never retry;
/// retry and session policy live in the session client.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Invoke `method` with positional `params` and return the decoded result
    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value>;

    /// Endpoint description for status reporting
    fn endpoint(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_config_default() {
        let config = TransportConfig::default();
        assert_eq!(config.endpoint, crate::protocol::DEFAULT_ENDPOINT);
        assert_eq!(config.user_agent, crate::protocol::DEFAULT_USER_AGENT);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
