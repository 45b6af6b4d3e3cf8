//! No-operation cache implementation
//!
//! A cache that never stores anything, for running without cache effects.

use crate::cache::traits::ResponseCache;
use crate::cache::{CacheKey, CacheStats, CachedPayload};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A cache implementation that doesn't cache anything
#[derive(Debug, Default)]
pub struct NoOpCache {
    misses: AtomicU64,
}

impl NoOpCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for NoOpCache {
    async fn get(&self, _key: &CacheKey) -> Option<CachedPayload> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn put(&self, _key: &CacheKey, _value: CachedPayload, _ttl: Duration) {}

    async fn invalidate(&self, _key: &CacheKey) -> bool {
        false
    }

    async fn clear(&self) {}

    async fn purge_expired(&self) -> usize {
        0
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            miss_count: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_cache_never_hits() {
        let cache = NoOpCache::new();
        let key = cache.make_key("content", &[("id", "1")]);

        cache
            .put(&key, CachedPayload::Text("body".into()), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get(&key).await, None);
        assert!(!cache.invalidate(&key).await);

        let stats = cache.stats().await;
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.miss_count, 1);
    }
}
