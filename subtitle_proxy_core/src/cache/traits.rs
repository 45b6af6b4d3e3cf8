//! Cache trait definitions
//!
//! This module defines the [`ResponseCache`] trait that all cache
//! implementations must implement.

use crate::cache::{CacheKey, CacheStats, CachedPayload};
use async_trait::async_trait;
use std::time::Duration;

/// Trait for response cache implementations
///
/// Misses are normal control flow, so no operation returns an error.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Get a live entry
    ///
    /// Returns `None` if the key was never stored or its TTL has elapsed.
    async fn get(&self, key: &CacheKey) -> Option<CachedPayload>;

    /// Store `value` until `ttl` elapses, overwriting any previous entry
    async fn put(&self, key: &CacheKey, value: CachedPayload, ttl: Duration);

    /// Remove a single entry, returning whether one was present
    async fn invalidate(&self, key: &CacheKey) -> bool;

    /// Remove all entries
    async fn clear(&self);

    /// Remove expired entries and return how many were dropped
    async fn purge_expired(&self) -> usize;

    /// Get cache statistics
    async fn stats(&self) -> CacheStats;

    /// Derive a key for an operation from its request parameters
    fn make_key(&self, namespace: &str, params: &[(&str, &str)]) -> CacheKey {
        CacheKey::from_params(namespace, params)
    }
}
