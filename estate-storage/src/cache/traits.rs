//! Cache store trait and backend statistics.
//!
//! This module defines the contract every cache backend implements. Values
//! are opaque bytes: encoding the snapshot is the accessor's job, so a
//! backend never needs to know what a Property is.

use async_trait::async_trait;
use estate_core::EstateResult;
use std::time::Duration;

/// Cache store trait for pluggable backends (in-memory, LMDB, Redis).
///
/// Implementations must be thread-safe and keep cumulative hit/miss counters
/// for `get`. Nothing in this crate resets those counters.
///
/// # Errors
///
/// A missing key is `Ok(None)`, never an error. When the backend cannot be
/// reached, methods return `CacheError::BackendUnavailable`; `stats` returns
/// `CacheError::StatsUnavailable` when the backend refuses the query.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a live value. Counts a hit when found, a miss otherwise.
    async fn get(&self, key: &str) -> EstateResult<Option<Vec<u8>>>;

    /// Store a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> EstateResult<()>;

    /// Remove a key. Removing an absent key is a no-op.
    async fn delete(&self, key: &str) -> EstateResult<()>;

    /// Cumulative backend counters.
    async fn stats(&self) -> EstateResult<CacheStats>;

    /// Short backend name for log records and errors.
    fn backend_name(&self) -> &'static str;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache, when the backend knows it.
    pub entry_count: u64,
}

impl CacheStats {
    /// Total number of lookups.
    pub fn total_operations(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }

    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_operations();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
