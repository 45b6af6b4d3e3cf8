//! Time-bounded response cache
//!
//! The cache is a trait-based abstraction so the in-memory store can be
//! swapped for another implementation. Expiry is lazy: a lookup past the
//! entry's deadline behaves exactly like a miss, and a periodic sweep only
//! reclaims memory.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

pub mod memory_cache;
pub mod noop_cache;
pub mod traits;

pub use memory_cache::{MemoryCache, MemoryCacheConfig};
pub use noop_cache::NoOpCache;
pub use traits::ResponseCache;

/// Cache key derived from an operation namespace and its request parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key from `(name, value)` parameter pairs
    ///
    /// Pairs are sorted before hashing, so the key does not depend on the
    /// order the caller supplied them in. Every field is length-prefixed,
    /// which keeps `("ab", "c")` and `("a", "bc")` apart. The digest is
    /// always 32 hex characters regardless of the input size.
    pub fn from_params(namespace: &str, params: &[(&str, &str)]) -> Self {
        let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
        sorted.sort();

        let mut hasher = Md5::new();
        for (name, value) in sorted {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }

        CacheKey(format!("{namespace}:{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Operation namespace the key was derived under
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map_or("", |(ns, _)| ns)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedPayload {
    /// Plain text such as decompressed or converted subtitle content
    Text(String),
    /// Structured data such as search results or download links
    Json(serde_json::Value),
}

impl CachedPayload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CachedPayload::Text(text) => Some(text),
            CachedPayload::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            CachedPayload::Json(value) => Some(value),
            CachedPayload::Text(_) => None,
        }
    }
}

/// Cache entry with expiry and access bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: CachedPayload,
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub active_entries: usize,
    pub expired_entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}
