//! Subtitle Proxy Core Library
//!
//! This is the core library of the subtitle proxy: a rate-limited,
//! session-authenticated client for the OpenSubtitles XML-RPC endpoint,
//! an in-memory response cache and an SRT/WebVTT converter, composed by
//! [`SubtitleService`].

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod protocol;
pub mod security;
pub mod service;

// Re-export main types
pub use cache::{CacheKey, CacheStats, CachedPayload, MemoryCache, NoOpCache, ResponseCache};
pub use config::ProxyConfig;
pub use error::{ConfigError, Error, Result, ServiceError};
pub use format::SubtitleFormat;
pub use protocol::{ProtocolError, SessionClient, SessionConfig, SessionState};
pub use security::SecureString;
pub use service::{
    DownloadLink, SearchCriteria, SearchTarget, ServiceConfig, ServiceStatus, SubtitleResult,
    SubtitleService,
};
