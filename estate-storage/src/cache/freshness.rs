//! Staleness metadata for snapshot reads.
//!
//! A cached snapshot may be up to one TTL old. [`CacheRead`] carries the
//! time the snapshot was materialized so callers that care can see how old
//! the data is and whether it came from the cache at all.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of a read-through lookup, carrying staleness metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    /// The value handed to the caller.
    value: T,
    /// When the snapshot was fetched from the System of Record.
    cached_at: DateTime<Utc>,
    /// Whether this was a cache hit or miss.
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: true,
        }
    }

    /// Create a new cache read from a System of Record fetch (cache miss).
    pub fn from_storage(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at: fetched_at,
            was_cache_hit: false,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Time elapsed since the snapshot was taken.
    pub fn staleness(&self) -> Duration {
        (Utc::now() - self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// When the snapshot was taken.
    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    /// Check if this was a cache hit.
    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    /// Check if this was a cache miss (fetched from the System of Record).
    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_read_from_cache() {
        let value = "test_value".to_string();
        let cached_at = Utc::now();
        let read = CacheRead::from_cache(value.clone(), cached_at);

        assert!(read.was_cache_hit());
        assert!(!read.was_cache_miss());
        assert_eq!(read.value(), &value);
        assert_eq!(read.cached_at(), cached_at);
    }

    #[test]
    fn test_cache_read_from_storage() {
        let read = CacheRead::from_storage(42i32, Utc::now());

        assert!(!read.was_cache_hit());
        assert!(read.was_cache_miss());
        assert_eq!(read.into_value(), 42);
    }

    #[test]
    fn test_cache_read_staleness() {
        let past = Utc::now() - chrono::Duration::seconds(5);
        let read = CacheRead::from_cache("test", past);

        let staleness = read.staleness();
        assert!(staleness >= Duration::from_secs(4));
        assert!(staleness <= Duration::from_secs(10));
    }

    #[test]
    fn test_future_timestamp_has_zero_staleness() {
        let future = Utc::now() + chrono::Duration::seconds(30);
        let read = CacheRead::from_cache("test", future);
        assert_eq!(read.staleness(), Duration::ZERO);
    }
}
