//! Common test utilities for integration tests
//!
//! Builds a [`SubtitleService`] over the mock transport and fetcher with a
//! short call interval so timing assertions stay fast.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use subtitle_proxy_core::cache::MemoryCache;
use subtitle_proxy_core::{ServiceConfig, SessionClient, SessionConfig, SubtitleService};
use subtitle_proxy_test_utils::{MockFetcher, MockTransport};

/// Call spacing used by the harness
pub const TEST_INTERVAL: Duration = Duration::from_millis(100);

pub struct ServiceHarness {
    pub transport: MockTransport,
    pub fetcher: MockFetcher,
    pub cache: Arc<MemoryCache>,
    pub service: SubtitleService,
}

impl ServiceHarness {
    pub fn new() -> Self {
        Self::with_parts(MockTransport::new(), MockFetcher::new(), ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        Self::with_parts(MockTransport::new(), MockFetcher::new(), config)
    }

    pub fn with_parts(transport: MockTransport, fetcher: MockFetcher, config: ServiceConfig) -> Self {
        let client = Arc::new(SessionClient::new(
            session_config(),
            Arc::new(transport.clone()),
        ));
        let cache = Arc::new(MemoryCache::new());
        let service = SubtitleService::new(client, cache.clone(), Arc::new(fetcher.clone()), config);

        Self {
            transport,
            fetcher,
            cache,
            service,
        }
    }
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        username: "tester".to_string(),
        password: "secret".into(),
        min_call_interval: TEST_INTERVAL,
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}
