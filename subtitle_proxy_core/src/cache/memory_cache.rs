//! Memory-based cache implementation
//!
//! This module provides an in-memory cache with lazy expiry, a bounded entry
//! count with LRU eviction, and an optional background sweeper.

use crate::cache::traits::ResponseCache;
use crate::cache::{CacheEntry, CacheKey, CacheStats, CachedPayload};
use async_trait::async_trait;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Longest lifetime an entry can get; larger TTLs are clamped to it
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Configuration for memory cache
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries to keep in cache
    pub max_entries: usize,
    /// Interval for the background sweep of expired entries
    pub sweep_interval: Duration,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            sweep_interval: Duration::from_secs(300), // 5 minutes
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    hit_count: u64,
    miss_count: u64,
}

/// In-memory response cache
pub struct MemoryCache {
    inner: RwLock<Inner>,
    config: MemoryCacheConfig,
}

impl MemoryCache {
    /// Create a new memory cache with default configuration
    pub fn new() -> Self {
        Self::with_config(MemoryCacheConfig::default())
    }

    /// Create a new memory cache with custom configuration
    pub fn with_config(config: MemoryCacheConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            config,
        }
    }

    pub fn config(&self) -> &MemoryCacheConfig {
        &self.config
    }

    /// Start a background task purging expired entries every `sweep_interval`
    ///
    /// The task only holds a weak reference and stops once the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    trace!("Cache dropped, stopping sweeper");
                    break;
                };
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    debug!("Cache sweep removed {purged} expired entries");
                }
            }
        })
    }

    /// Make room for one more entry, dropping expired entries first
    fn evict_if_needed(&self, inner: &mut Inner, now: Instant) {
        if self.config.max_entries == 0 || inner.entries.len() < self.config.max_entries {
            return;
        }

        inner.entries.retain(|_, entry| !entry.is_expired_at(now));

        while inner.entries.len() >= self.config.max_entries {
            let Some(oldest_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            trace!("Evicting least recently used entry {oldest_key}");
            inner.entries.remove(&oldest_key);
        }
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedPayload> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let now = Instant::now();

        if inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now))
        {
            inner.entries.remove(key);
        }

        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = now;
                entry.access_count += 1;
                inner.hit_count += 1;
                trace!("Cache hit for {key}");
                Some(entry.payload.clone())
            }
            None => {
                inner.miss_count += 1;
                trace!("Cache miss for {key}");
                None
            }
        }
    }

    async fn put(&self, key: &CacheKey, value: CachedPayload, ttl: Duration) {
        let mut inner = self.inner.write().await;
        let now = Instant::now();

        if !inner.entries.contains_key(key) {
            self.evict_if_needed(&mut inner, now);
        }

        inner.entries.insert(
            key.clone(),
            CacheEntry {
                payload: value,
                created_at: now,
                last_accessed: now,
                access_count: 0,
                expires_at: now
                    .checked_add(ttl.min(MAX_TTL))
                    .unwrap_or(now + Duration::from_secs(24 * 60 * 60)),
            },
        );
    }

    async fn invalidate(&self, key: &CacheKey) -> bool {
        self.inner.write().await.entries.remove(key).is_some()
    }

    async fn clear(&self) {
        let mut inner = self.inner.write().await;
        *inner = Inner::default();
    }

    async fn purge_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let now = Instant::now();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - inner.entries.len()
    }

    async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        let now = Instant::now();
        let expired_entries = inner
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .count();

        CacheStats {
            entry_count: inner.entries.len(),
            active_entries: inner.entries.len() - expired_entries,
            expired_entries,
            hit_count: inner.hit_count,
            miss_count: inner.miss_count,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}
