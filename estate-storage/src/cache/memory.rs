//! In-process cache store.
//!
//! Entries carry a deadline on the tokio clock, so paused-time tests can
//! step past a TTL without sleeping. Expired entries are dropped lazily on
//! the next lookup of their key. A TTL past the clock's range never expires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use estate_core::EstateResult;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::traits::{CacheStats, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// In-memory cache store with TTL and process-wide hit/miss counters.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryCacheStore {
    /// Create an empty store with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose counters start where a long-running backend's
    /// would be.
    pub fn with_counters(hits: u64, misses: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(hits),
            misses: AtomicU64::new(misses),
        }
    }

    /// Whether a live entry exists for `key`. Does not touch the counters.
    pub async fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Number of live entries.
    pub async fn entry_count(&self) -> u64 {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count() as u64
    }

    async fn evict_if_expired(&self, key: &str) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> EstateResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let (value, expired) = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => (Some(entry.value.clone()), false),
                Some(_) => (None, true),
                None => (None, false),
            }
        };

        if expired {
            self.evict_if_expired(key).await;
        }

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, backend = "memory", "Cache HIT");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, backend = "memory", expired, "Cache MISS");
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> EstateResult<()> {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        tracing::debug!(key, backend = "memory", ttl_seconds = ttl.as_secs(), "Cache SET");
        Ok(())
    }

    async fn delete(&self, key: &str) -> EstateResult<()> {
        let removed = self.entries.write().await.remove(key).is_some();
        tracing::debug!(key, backend = "memory", removed, "Cache DEL");
        Ok(())
    }

    async fn stats(&self) -> EstateResult<CacheStats> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entry_count().await,
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "all_properties";

    #[tokio::test]
    async fn test_set_then_get_is_hit() {
        let store = InMemoryCacheStore::new();
        store.set(KEY, b"payload", Duration::from_secs(60)).await.unwrap();

        let value = store.get(KEY).await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"payload"[..]));

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_get_absent_is_miss() {
        let store = InMemoryCacheStore::new();
        assert!(store.get(KEY).await.unwrap().is_none());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = InMemoryCacheStore::new();
        store.set(KEY, b"payload", Duration::from_secs(3600)).await.unwrap();

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert!(store.get(KEY).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get(KEY).await.unwrap().is_none());
        assert!(!store.contains_key(KEY).await);
        assert_eq!(store.entry_count().await, 0);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_unbounded_ttl_does_not_overflow() {
        let store = InMemoryCacheStore::new();
        store
            .set(KEY, b"payload", Duration::from_secs(u64::MAX))
            .await
            .unwrap();

        assert_eq!(store.get(KEY).await.unwrap().as_deref(), Some(&b"payload"[..]));
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_noop() {
        let store = InMemoryCacheStore::new();
        store.delete(KEY).await.unwrap();
        store.delete(KEY).await.unwrap();
        assert!(!store.contains_key(KEY).await);
    }

    #[tokio::test]
    async fn test_set_overwrites_existing_value() {
        let store = InMemoryCacheStore::new();
        store.set(KEY, b"first", Duration::from_secs(60)).await.unwrap();
        store.set(KEY, b"second", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get(KEY).await.unwrap().as_deref(), Some(&b"second"[..]));
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_seeded_counters_accumulate() {
        let store = InMemoryCacheStore::with_counters(37, 13);
        let _ = store.get(KEY).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.hits, 37);
        assert_eq!(stats.misses, 14);
    }

    #[tokio::test]
    async fn test_contains_key_does_not_count() {
        let store = InMemoryCacheStore::new();
        store.set(KEY, b"payload", Duration::from_secs(60)).await.unwrap();
        assert!(store.contains_key(KEY).await);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_operations(), 0);
    }
}
