//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep snapshots in a
//! memory-mapped file that survives process restarts.
//!
//! # Value Layout
//!
//! Each value is stored as `[expires_at_millis: i64 LE][payload]`. A read
//! past the deadline counts as a miss and removes the entry. So does a value
//! too short to carry the header.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get`
//! - Write transactions for `set`, `delete` and expiry cleanup
//! - Atomic counters for hit/miss statistics

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use estate_core::{CacheError, EstateError, EstateResult};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::traits::{CacheStats, CacheStore};

const HEADER_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored value is shorter than its header.
    #[error("Corrupt entry for key {0}")]
    CorruptEntry(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for EstateError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::CorruptEntry(_) => EstateError::Cache(CacheError::Codec {
                reason: e.to_string(),
            }),
            _ => EstateError::Cache(CacheError::BackendUnavailable {
                backend: "lmdb".to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

fn txn_err(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// LMDB-backed cache store.
///
/// # Example
///
/// ```ignore
/// use estate_storage::cache::{CacheStore, LmdbCacheStore};
/// use std::time::Duration;
///
/// let store = LmdbCacheStore::new("/var/cache/estate", 64)?;
/// store.set("all_properties", &payload, Duration::from_secs(3600)).await?;
/// let cached = store.get("all_properties").await?;
/// ```
pub struct LmdbCacheStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LmdbCacheStore {
    /// Create a new LMDB cache store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: each environment path is opened once per process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self {
            env,
            db,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn encode(value: &[u8], ttl: Duration) -> Vec<u8> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp_millis().saturating_add(ttl_millis);

        let mut bytes = Vec::with_capacity(HEADER_LEN + value.len());
        bytes.extend_from_slice(&expires_at.to_le_bytes());
        bytes.extend_from_slice(value);
        bytes
    }

    /// Split a stored value into its deadline and payload.
    fn decode<'a>(key: &str, bytes: &'a [u8]) -> Result<(i64, &'a [u8]), LmdbCacheError> {
        let (header, payload) = bytes
            .split_first_chunk::<HEADER_LEN>()
            .ok_or_else(|| LmdbCacheError::CorruptEntry(key.to_string()))?;
        Ok((i64::from_le_bytes(*header), payload))
    }

    fn remove(&self, key: &str) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let deleted = self.db.delete(&mut wtxn, key.as_bytes()).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(deleted)
    }

    /// Count a lookup. Failed lookups are neither hits nor misses.
    fn record(&self, key: &str, outcome: &Result<Option<Vec<u8>>, LmdbCacheError>) {
        match outcome {
            Ok(Some(_)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, backend = "lmdb", "Cache HIT");
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, backend = "lmdb", "Cache MISS");
            }
            Err(e) => {
                tracing::error!(key, backend = "lmdb", error = %e, "Cache GET failed");
            }
        }
    }

    fn lookup(&self, key: &str) -> Result<Option<Vec<u8>>, LmdbCacheError> {
        let found = {
            let rtxn = self.env.read_txn().map_err(txn_err)?;
            match self.db.get(&rtxn, key.as_bytes()).map_err(txn_err)? {
                Some(bytes) => match Self::decode(key, bytes) {
                    Ok((expires_at, payload)) => Some(Some((expires_at, payload.to_vec()))),
                    Err(e) => {
                        tracing::warn!(key, backend = "lmdb", error = %e, "Dropping unreadable cache entry");
                        Some(None)
                    }
                },
                None => None,
            }
        };

        match found {
            Some(Some((expires_at, payload))) if Utc::now().timestamp_millis() < expires_at => {
                Ok(Some(payload))
            }
            Some(_) => {
                self.remove(key)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get(&self, key: &str) -> EstateResult<Option<Vec<u8>>> {
        let outcome = self.lookup(key);
        self.record(key, &outcome);
        Ok(outcome?)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> EstateResult<()> {
        let bytes = Self::encode(value, ttl);

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), &bytes)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        tracing::debug!(key, backend = "lmdb", ttl_seconds = ttl.as_secs(), "Cache SET");
        Ok(())
    }

    async fn delete(&self, key: &str) -> EstateResult<()> {
        let removed = self.remove(key)?;
        tracing::debug!(key, backend = "lmdb", removed, "Cache DEL");
        Ok(())
    }

    async fn stats(&self) -> EstateResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(|e| CacheError::StatsUnavailable {
            backend: "lmdb".to_string(),
            reason: e.to_string(),
        })?;
        let entry_count = self.db.len(&rtxn).map_err(|e| CacheError::StatsUnavailable {
            backend: "lmdb".to_string(),
            reason: e.to_string(),
        })?;

        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
        })
    }

    fn backend_name(&self) -> &'static str {
        "lmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: &str = "all_properties";

    fn create_test_store() -> (LmdbCacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store =
            LmdbCacheStore::new(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _temp_dir) = create_test_store();

        store
            .set(KEY, b"[1,2,3]", Duration::from_secs(3600))
            .await
            .expect("set should succeed");

        let cached = store.get(KEY).await.expect("get should succeed");
        assert_eq!(cached.as_deref(), Some(&b"[1,2,3]"[..]));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (store, _temp_dir) = create_test_store();
        let cached = store.get(KEY).await.expect("get should succeed");
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _temp_dir) = create_test_store();

        store
            .set(KEY, b"payload", Duration::from_secs(3600))
            .await
            .expect("set should succeed");
        store.delete(KEY).await.expect("delete should succeed");

        assert!(store.get(KEY).await.expect("get should succeed").is_none());
        // Second delete of the same key is a no-op.
        store.delete(KEY).await.expect("delete should succeed");
    }

    #[tokio::test]
    async fn test_zero_ttl_is_never_live() {
        let (store, _temp_dir) = create_test_store();

        store
            .set(KEY, b"payload", Duration::ZERO)
            .await
            .expect("set should succeed");

        assert!(store.get(KEY).await.expect("get should succeed").is_none());
        let stats = store.stats().await.expect("stats should succeed");
        assert_eq!(stats.entry_count, 0, "expired entry should be removed");
    }

    #[tokio::test]
    async fn test_stats() {
        let (store, _temp_dir) = create_test_store();

        let _ = store.get(KEY).await;
        store
            .set(KEY, b"payload", Duration::from_secs(3600))
            .await
            .expect("set should succeed");
        let _ = store.get(KEY).await;
        let _ = store.get(KEY).await;

        let stats = store.stats().await.expect("stats should succeed");
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (store, _temp_dir) = create_test_store();

        store
            .set(KEY, b"first", Duration::from_secs(3600))
            .await
            .expect("set should succeed");
        store
            .set(KEY, b"second", Duration::from_secs(3600))
            .await
            .expect("set should succeed");

        let cached = store.get(KEY).await.expect("get should succeed");
        assert_eq!(cached.as_deref(), Some(&b"second"[..]));
    }

    #[tokio::test]
    async fn test_short_value_is_dropped_as_miss() {
        let (store, _temp_dir) = create_test_store();

        let mut wtxn = store.env.write_txn().unwrap();
        store.db.put(&mut wtxn, KEY.as_bytes(), &[1u8, 2, 3][..]).unwrap();
        wtxn.commit().unwrap();

        assert!(store.get(KEY).await.expect("get should succeed").is_none());
        let stats = store.stats().await.expect("stats should succeed");
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 0, "unreadable entry should be removed");

        // The key is usable again afterwards.
        store
            .set(KEY, b"payload", Duration::from_secs(3600))
            .await
            .expect("set should succeed");
        assert!(store.get(KEY).await.expect("get should succeed").is_some());
    }

    #[test]
    fn test_failed_lookup_is_not_counted() {
        let (store, _temp_dir) = create_test_store();

        store.record(KEY, &Err(LmdbCacheError::Transaction("reader table full".to_string())));
        store.record(KEY, &Ok(None));

        assert_eq!(store.hits.load(Ordering::Relaxed), 0);
        assert_eq!(store.misses.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_decode_rejects_short_value() {
        let err = LmdbCacheStore::decode(KEY, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, LmdbCacheError::CorruptEntry(_)));

        let estate: EstateError = err.into();
        assert!(matches!(estate, EstateError::Cache(CacheError::Codec { .. })));
    }
}
