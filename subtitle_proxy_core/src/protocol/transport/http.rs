//! XML-RPC over HTTP transport

use crate::protocol::codec::{self, Value};
use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::transport::{RemoteTransport, TransportConfig};
use async_trait::async_trait;
use log::{debug, trace, warn};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

/// HTTP transport posting `methodCall` documents to the endpoint
pub struct XmlRpcTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl XmlRpcTransport {
    /// Create a new transport instance
    pub fn new(config: TransportConfig) -> Result<Self> {
        debug!("Creating XML-RPC transport for {}", config.endpoint);
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl RemoteTransport for XmlRpcTransport {
    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        debug!("Invoking {}", codec::describe_call(method, &params));
        let body = codec::encode_call(method, &params)?;

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "text/xml")
            .header(USER_AGENT, &self.config.user_agent)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProtocolError::Timeout(self.config.request_timeout)
                } else {
                    warn!("{method} request failed: {e}");
                    ProtocolError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{method} returned HTTP {status}");
            return Err(ProtocolError::transport(format!(
                "HTTP {status} from {}",
                self.config.endpoint
            )));
        }

        let text = response.text().await?;
        trace!("{method} response: {} bytes", text.len());
        codec::decode_response(&text)
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}
