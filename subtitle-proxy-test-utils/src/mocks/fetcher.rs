//! In-memory [`ContentFetcher`]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use subtitle_proxy_core::format::{ContentFetcher, FetchError};

#[derive(Debug, Clone)]
enum MockResponse {
    Body(String),
    Status(u16),
}

/// Serves fixed bodies by URL; unknown URLs answer HTTP 404
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: &str, body: &str) -> Self {
        self.insert(url, MockResponse::Body(body.to_string()));
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.insert(url, MockResponse::Status(status));
        self
    }

    /// URLs fetched so far, in order
    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .expect("mock fetcher lock poisoned")
            .clone()
    }

    fn insert(&self, url: &str, response: MockResponse) {
        self.responses
            .lock()
            .expect("mock fetcher lock poisoned")
            .insert(url.to_string(), response);
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requested
            .lock()
            .expect("mock fetcher lock poisoned")
            .push(url.to_string());

        let response = self
            .responses
            .lock()
            .expect("mock fetcher lock poisoned")
            .get(url)
            .cloned()
            .unwrap_or(MockResponse::Status(404));

        match response {
            MockResponse::Body(body) => Ok(body),
            MockResponse::Status(status) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }
}
