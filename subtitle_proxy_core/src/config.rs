//! Proxy configuration
//!
//! Plain serde structures with defaults for every field, so any subset can be
//! supplied by a configuration file or environment layer.

use crate::cache::MemoryCacheConfig;
use crate::error::ConfigError;
use crate::protocol::{self, SessionConfig, TransportConfig};
use crate::security::SecureString;
use crate::service::ServiceConfig;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub service: ServiceSettings,
}

/// Remote endpoint and session settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub username: String,
    #[serde(serialize_with = "mask_secret")]
    pub password: SecureString,
    pub language: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub min_call_interval_ms: u64,
    pub session_ttl_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: protocol::DEFAULT_ENDPOINT.to_string(),
            username: String::new(),
            password: SecureString::default(),
            language: protocol::DEFAULT_LANGUAGE.to_string(),
            user_agent: protocol::DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            min_call_interval_ms: protocol::MIN_CALL_INTERVAL.as_millis() as u64,
            session_ttl_secs: protocol::SESSION_TTL.as_secs(),
        }
    }
}

/// In-memory cache settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            sweep_interval_secs: 300,
        }
    }
}

/// Service TTLs and output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceSettings {
    pub search_ttl_secs: u64,
    pub content_ttl_secs: u64,
    pub link_ttl_secs: u64,
    pub max_results: usize,
    pub public_base_url: Option<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            search_ttl_secs: 900,
            content_ttl_secs: 3600,
            link_ttl_secs: 1800,
            max_results: 10,
            public_base_url: None,
        }
    }
}

fn mask_secret<S: Serializer>(secret: &SecureString, serializer: S) -> Result<S::Ok, S::Error> {
    if secret.is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str("***")
    }
}

impl ProxyConfig {
    /// Check values that would make the proxy unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = &self.remote.endpoint;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::invalid_value(
                "remote.endpoint",
                format!("'{endpoint}' is not an http(s) URL"),
            ));
        }
        if self.remote.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "remote.user_agent",
                "must not be empty",
            ));
        }
        if self.remote.request_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "remote.request_timeout_secs",
                "must be at least 1",
            ));
        }
        if self.service.max_results == 0 {
            return Err(ConfigError::invalid_value(
                "service.max_results",
                "must be at least 1",
            ));
        }
        if let Some(base) = &self.service.public_base_url
            && !(base.starts_with("http://") || base.starts_with("https://"))
        {
            return Err(ConfigError::invalid_value(
                "service.public_base_url",
                format!("'{base}' is not an http(s) URL"),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.request_timeout_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            username: self.remote.username.clone(),
            password: self.remote.password.clone(),
            language: self.remote.language.clone(),
            user_agent: self.remote.user_agent.clone(),
            request_timeout: self.request_timeout(),
            min_call_interval: Duration::from_millis(self.remote.min_call_interval_ms),
            session_ttl: Duration::from_secs(self.remote.session_ttl_secs),
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            endpoint: self.remote.endpoint.clone(),
            user_agent: self.remote.user_agent.clone(),
            request_timeout: self.request_timeout(),
            ..Default::default()
        }
    }

    pub fn cache_config(&self) -> MemoryCacheConfig {
        MemoryCacheConfig {
            max_entries: self.cache.max_entries,
            sweep_interval: Duration::from_secs(self.cache.sweep_interval_secs.max(1)),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            search_ttl: Duration::from_secs(self.service.search_ttl_secs),
            content_ttl: Duration::from_secs(self.service.content_ttl_secs),
            link_ttl: Duration::from_secs(self.service.link_ttl_secs),
            max_results: self.service.max_results,
            public_base_url: self
                .service
                .public_base_url
                .as_ref()
                .map(|base| base.trim_end_matches('/').to_string()),
        }
    }
}
