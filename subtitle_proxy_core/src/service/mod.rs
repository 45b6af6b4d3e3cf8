//! Subtitle service orchestrating the session client, cache and converter
//!
//! Every operation consults the cache first. On a miss the remote is called
//! through the [`SessionClient`], the result is optionally converted and then
//! written back. Concurrent misses for the same key are serialized, so the
//! followers find the leader's entry instead of calling the remote again.

mod coalesce;
mod criteria;
mod result;

pub use criteria::{SearchCriteria, SearchTarget};
pub use result::{DownloadLink, SubtitleResult};

use crate::cache::{CacheKey, CacheStats, CachedPayload, MemoryCache, ResponseCache};
use crate::config::ProxyConfig;
use crate::error::{ConfigError, Result as CrateResult, ServiceError};
use crate::format::{self, ContentFetcher, HttpFetcher, SubtitleFormat};
use crate::protocol::{SessionClient, SessionInfo, Value, XmlRpcTransport};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use coalesce::KeyLocks;
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::future::Future;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Service TTLs and link settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub search_ttl: Duration,
    pub content_ttl: Duration,
    pub link_ttl: Duration,
    /// Upper bound on the number of search results returned
    pub max_results: usize,
    /// Base URL under which `/api/v1/content/{id}` is published; search links
    /// are relative when unset
    pub public_base_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            search_ttl: Duration::from_secs(900),
            content_ttl: Duration::from_secs(3600),
            link_ttl: Duration::from_secs(1800),
            max_results: 10,
            public_base_url: None,
        }
    }
}

/// Health report of the service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub endpoint: String,
    pub credentials_configured: bool,
    pub session: SessionInfo,
    pub cache: CacheStats,
    pub supported_formats: Vec<SubtitleFormat>,
    pub version: &'static str,
    pub checked_at: DateTime<Utc>,
}

/// Values that can be stored in the response cache
trait Cacheable: Sized {
    fn to_payload(&self) -> Option<CachedPayload>;
    fn from_payload(payload: CachedPayload) -> Option<Self>;
}

impl Cacheable for String {
    fn to_payload(&self) -> Option<CachedPayload> {
        Some(CachedPayload::Text(self.clone()))
    }

    fn from_payload(payload: CachedPayload) -> Option<Self> {
        match payload {
            CachedPayload::Text(text) => Some(text),
            CachedPayload::Json(_) => None,
        }
    }
}

fn json_payload<T: Serialize>(value: &T) -> Option<CachedPayload> {
    serde_json::to_value(value).ok().map(CachedPayload::Json)
}

fn from_json_payload<T: DeserializeOwned>(payload: CachedPayload) -> Option<T> {
    match payload {
        CachedPayload::Json(value) => serde_json::from_value(value).ok(),
        CachedPayload::Text(_) => None,
    }
}

impl Cacheable for Vec<SubtitleResult> {
    fn to_payload(&self) -> Option<CachedPayload> {
        json_payload(self)
    }

    fn from_payload(payload: CachedPayload) -> Option<Self> {
        from_json_payload(payload)
    }
}

impl Cacheable for DownloadLink {
    fn to_payload(&self) -> Option<CachedPayload> {
        json_payload(self)
    }

    fn from_payload(payload: CachedPayload) -> Option<Self> {
        from_json_payload(payload)
    }
}

/// Rate-limited, cached subtitle search and delivery
pub struct SubtitleService {
    client: Arc<SessionClient>,
    cache: Arc<dyn ResponseCache>,
    fetcher: Arc<dyn ContentFetcher>,
    config: ServiceConfig,
    in_flight: KeyLocks,
}

impl SubtitleService {
    pub fn new(
        client: Arc<SessionClient>,
        cache: Arc<dyn ResponseCache>,
        fetcher: Arc<dyn ContentFetcher>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            client,
            cache,
            fetcher,
            config,
            in_flight: KeyLocks::default(),
        }
    }

    /// Build the production stack: HTTP transport, memory cache with sweeper
    /// and HTTP fetcher
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(config: &ProxyConfig) -> CrateResult<Self> {
        config.validate()?;

        let transport = XmlRpcTransport::new(config.transport_config())
            .map_err(|e| ConfigError::http_client(e.to_string()))?;
        let client = Arc::new(SessionClient::new(
            config.session_config(),
            Arc::new(transport),
        ));

        let cache = Arc::new(MemoryCache::with_config(config.cache_config()));
        cache.spawn_sweeper();

        let fetcher = HttpFetcher::new(config.request_timeout(), config.remote.user_agent.clone())
            .map_err(|e| ConfigError::http_client(e.to_string()))?;

        Ok(Self::new(
            client,
            cache,
            Arc::new(fetcher),
            config.service_config(),
        ))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<SessionClient> {
        &self.client
    }

    /// Search for subtitles
    ///
    /// A successful search without matches yields an empty list.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<SubtitleResult>> {
        let criteria = criteria.normalized();
        let key = criteria.cache_key();

        self.memoize(key, self.config.search_ttl, || async {
            debug!("Searching remote for {:?}", criteria.target);
            let response = self
                .client
                .call(
                    "SearchSubtitles",
                    vec![Value::Array(vec![criteria.to_remote()])],
                )
                .await?;

            let records = response.get("data").and_then(Value::as_array).unwrap_or(&[]);
            let mut results: Vec<SubtitleResult> = records
                .iter()
                .filter_map(|record| {
                    let mut result = SubtitleResult::from_record(record, criteria.format)?;
                    result.download_url = self.content_url(&result.file_id, criteria.format);
                    Some(result)
                })
                .take(self.config.max_results)
                .collect();

            if criteria.include_content {
                for result in &mut results {
                    result.raw_content =
                        Some(self.content_in(&result.file_id, criteria.format).await?);
                }
            }

            info!("Found {} subtitles", results.len());
            Ok(results)
        })
        .await
    }

    /// Link to the decompressed SubRip content of `file_id`
    pub async fn get_download_link(&self, file_id: &str) -> Result<DownloadLink> {
        self.get_download_link_as(file_id, SubtitleFormat::Srt).await
    }

    /// Link to the decompressed content of `file_id` in `format`
    ///
    /// The link points at the public content endpoint when a base URL is
    /// configured, otherwise it is a `data:` URL embedding the text.
    pub async fn get_download_link_as(
        &self,
        file_id: &str,
        format: SubtitleFormat,
    ) -> Result<DownloadLink> {
        let file_id = Self::check_file_id(file_id)?;
        let key = self.cache.make_key(
            "link",
            &[("file_id", file_id), ("format", format.as_str())],
        );

        self.memoize(key, self.config.link_ttl, || async {
            let content = self.content_in(file_id, format).await?;
            let url = if self.config.public_base_url.is_some() {
                self.content_url(file_id, format)
            } else {
                format::to_data_url(&content)
            };

            Ok(DownloadLink {
                file_id: file_id.to_string(),
                url,
                file_name: DownloadLink::file_name_for(file_id, format),
                format,
            })
        })
        .await
    }

    /// Decompressed SubRip text of `file_id`
    pub async fn fetch_content(&self, file_id: &str) -> Result<String> {
        let file_id = Self::check_file_id(file_id)?;
        let key = self.cache.make_key(
            "content",
            &[("file_id", file_id), ("format", SubtitleFormat::Srt.as_str())],
        );

        self.memoize(key, self.config.content_ttl, || self.download(file_id))
            .await
    }

    /// Content of `file_id` converted to `target`, cached per target format
    pub async fn convert_and_cache(&self, file_id: &str, target: SubtitleFormat) -> Result<String> {
        let file_id = Self::check_file_id(file_id)?;
        let key = self.cache.make_key(
            "converted",
            &[("file_id", file_id), ("format", target.as_str())],
        );

        self.memoize(key, self.config.content_ttl, || async {
            let raw = self.fetch_content(file_id).await?;
            Ok(format::convert(&raw, SubtitleFormat::Srt, target))
        })
        .await
    }

    /// Fetch subtitle text from `url` and convert it
    pub async fn convert_url(
        &self,
        url: &str,
        from: SubtitleFormat,
        to: SubtitleFormat,
    ) -> Result<String> {
        Ok(format::convert_url(self.fetcher.as_ref(), url, from, to).await?)
    }

    /// Local health report; makes no remote call
    pub async fn status(&self) -> ServiceStatus {
        ServiceStatus {
            endpoint: self.client.endpoint().to_string(),
            credentials_configured: self.client.config().has_credentials(),
            session: self.client.session_info().await,
            cache: self.cache.stats().await,
            supported_formats: SubtitleFormat::ALL.to_vec(),
            version: env!("CARGO_PKG_VERSION"),
            checked_at: Utc::now(),
        }
    }

    /// Scalar members of the remote `ServerInfo` response
    pub async fn server_info(&self) -> Result<BTreeMap<String, String>> {
        let info = self.client.server_info().await?;
        let members = info
            .as_struct()
            .ok_or_else(|| ServiceError::upstream("ServerInfo did not return a struct"))?;

        Ok(members
            .iter()
            .filter_map(|(name, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    Value::Int(i) => i.to_string(),
                    Value::Double(d) => d.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((name.clone(), rendered))
            })
            .collect())
    }

    /// End the remote session
    pub async fn shutdown(&self) {
        debug!("Shutting down subtitle service");
        self.client.logout().await;
    }

    async fn content_in(&self, file_id: &str, format: SubtitleFormat) -> Result<String> {
        match format {
            SubtitleFormat::Srt => self.fetch_content(file_id).await,
            other => self.convert_and_cache(file_id, other).await,
        }
    }

    /// Content endpoint for `file_id`, relative when no base URL is configured
    ///
    /// The remote's own `SubDownloadLink` serves gzip and is never exposed.
    fn content_url(&self, file_id: &str, format: SubtitleFormat) -> String {
        let base = self.config.public_base_url.as_deref().unwrap_or_default();
        format!("{base}/api/v1/content/{file_id}?format={format}")
    }

    fn check_file_id(file_id: &str) -> Result<&str> {
        let file_id = file_id.trim();
        if file_id.is_empty() {
            Err(ServiceError::not_found("empty file id"))
        } else {
            Ok(file_id)
        }
    }

    /// `DownloadSubtitles`, base64-decode and gunzip
    async fn download(&self, file_id: &str) -> Result<String> {
        debug!("Downloading subtitle file {file_id}");
        let response = self
            .client
            .call(
                "DownloadSubtitles",
                vec![Value::Array(vec![Value::from(file_id)])],
            )
            .await?;

        let encoded = response
            .get("data")
            .and_then(Value::as_array)
            .and_then(|records| records.first())
            .and_then(|record| match record.get("data") {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_bytes().to_vec()),
                Some(Value::Base64(bytes)) if !bytes.is_empty() => Some(bytes.clone()),
                _ => None,
            })
            .ok_or_else(|| ServiceError::not_found(format!("subtitle file {file_id}")))?;

        decode_payload(&encoded).map_err(|reason| {
            warn!("Undecodable payload for subtitle file {file_id}: {reason}");
            ServiceError::upstream(format!("subtitle file {file_id}: {reason}"))
        })
    }

    /// Serve `key` from the cache or compute, store and return it
    ///
    /// Misses for the same key are serialized and re-check the cache once
    /// they hold the key, so only the first of several concurrent callers
    /// reaches the remote. Failures are not cached.
    async fn memoize<T, F, Fut>(&self, key: CacheKey, ttl: Duration, compute: F) -> Result<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.lookup(&key).await {
            return Ok(hit);
        }

        let _guard = self.in_flight.acquire(&key).await;
        if let Some(hit) = self.lookup(&key).await {
            debug!("{key} was filled while waiting");
            return Ok(hit);
        }

        let value = compute().await?;
        if let Some(payload) = value.to_payload() {
            self.cache.put(&key, payload, ttl).await;
        }
        Ok(value)
    }

    async fn lookup<T: Cacheable>(&self, key: &CacheKey) -> Option<T> {
        let payload = self.cache.get(key).await?;
        let value = T::from_payload(payload);
        if value.is_none() {
            warn!("Discarding cache entry {key} of unexpected shape");
            self.cache.invalidate(key).await;
        }
        value
    }
}

/// Decode a `DownloadSubtitles` payload: base64 (whitespace tolerated), gzip, UTF-8
fn decode_payload(encoded: &[u8]) -> std::result::Result<String, String> {
    let compact: Vec<u8> = encoded
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let compressed = STANDARD
        .decode(&compact)
        .map_err(|e| format!("invalid base64: {e}"))?;

    let mut decompressed = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut decompressed)
        .map_err(|e| format!("invalid gzip: {e}"))?;

    String::from_utf8(decompressed).map_err(|e| format!("invalid UTF-8: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn encode(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        STANDARD.encode(encoder.finish().unwrap()).into_bytes()
    }

    #[test]
    fn test_decode_payload() {
        let text = "1\n00:00:01,000 --> 00:00:02,000\nHi\n";
        assert_eq!(decode_payload(&encode(text)).unwrap(), text);
    }

    #[test]
    fn test_decode_payload_tolerates_line_breaks() {
        let text = "a fairly long subtitle line that pushes the encoding past one line";
        let mut encoded = encode(text);
        encoded.insert(20, b'\n');
        encoded.insert(10, b'\r');
        assert_eq!(decode_payload(&encoded).unwrap(), text);
    }

    #[test]
    fn test_decode_payload_errors() {
        assert!(decode_payload(b"!!!not base64!!!").unwrap_err().contains("base64"));
        let not_gzip = STANDARD.encode("plain text").into_bytes();
        assert!(decode_payload(&not_gzip).unwrap_err().contains("gzip"));
    }

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.search_ttl, Duration::from_secs(900));
        assert_eq!(config.content_ttl, Duration::from_secs(3600));
        assert_eq!(config.link_ttl, Duration::from_secs(1800));
        assert_eq!(config.max_results, 10);
        assert!(config.public_base_url.is_none());
    }

    #[test]
    fn test_cacheable_round_trip() {
        let link = DownloadLink {
            file_id: "1".to_string(),
            url: "data:text/plain;base64,".to_string(),
            file_name: "subtitle_1.srt".to_string(),
            format: SubtitleFormat::Srt,
        };
        let payload = link.to_payload().unwrap();
        assert_eq!(DownloadLink::from_payload(payload), Some(link));

        let text = CachedPayload::Text("x".to_string());
        assert_eq!(DownloadLink::from_payload(text.clone()), None);
        assert_eq!(String::from_payload(text), Some("x".to_string()));
    }
}
