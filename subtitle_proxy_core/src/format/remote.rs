//! Fetching subtitle text from a URL and converting it

use crate::format::{SubtitleFormat, convert};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use reqwest::header::USER_AGENT;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while fetching remote subtitle text
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

/// Source of raw subtitle text addressed by URL
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP GET fetcher bounded by a request timeout
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            timeout,
            user_agent: user_agent.into(),
        })
    }

    fn parse_url(url: &str) -> Result<reqwest::Url, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Self::parse_url(url)?;
        debug!("Fetching subtitle text from {parsed}");

        let request_error = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }
            } else {
                FetchError::Request {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(parsed)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!("{url} returned HTTP {status}");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(request_error)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Fetch subtitle text from `url` and convert it
pub async fn convert_url(
    fetcher: &dyn ContentFetcher,
    url: &str,
    from: SubtitleFormat,
    to: SubtitleFormat,
) -> Result<String, FetchError> {
    let content = fetcher.fetch(url).await?;
    Ok(convert(&content, from, to))
}

/// Embed text in a `data:` URL
pub fn to_data_url(content: &str) -> String {
    format!("data:text/plain;base64,{}", STANDARD.encode(content.as_bytes()))
}
