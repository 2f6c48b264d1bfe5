//! Snapshot cache for the Property collection.
//!
//! The full collection is cached as one opaque snapshot under a single key.
//! [`ReadThroughCache`] populates it on a miss, [`InvalidationHooks`] evict it
//! whenever the System of Record commits a Property mutation, and
//! [`MetricsReader`] reports how often reads were served from the cache.
//!
//! Backends implement [`CacheStore`] over opaque bytes:
//!
//! - [`InMemoryCacheStore`] for a single process
//! - [`LmdbCacheStore`] for a snapshot that survives restarts
//! - `RedisCacheStore` for a shared cache (`cache-redis` feature)
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(InMemoryCacheStore::new());
//! let records = Arc::new(InMemoryPropertyStore::new());
//!
//! let cache = ReadThroughCache::new(store.clone(), records.clone(), CacheConfig::from_env());
//! Arc::new(cache.invalidation_hooks())
//!     .register(records.as_ref())
//!     .await;
//!
//! let properties = cache.get_all_properties().await?;
//!
//! let metrics = MetricsReader::new(store).get_cache_metrics().await;
//! ```

pub mod freshness;
pub mod invalidation;
pub mod lmdb_backend;
pub mod memory;
pub mod metrics;
pub mod read_through;
#[cfg(feature = "cache-redis")]
pub mod redis_backend;
pub mod snapshot;
pub mod traits;

pub use freshness::CacheRead;
pub use invalidation::InvalidationHooks;
pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory::InMemoryCacheStore;
pub use metrics::{CacheMetricsSnapshot, MetricsReader};
pub use read_through::{CacheConfig, ReadThroughCache};
#[cfg(feature = "cache-redis")]
pub use redis_backend::{RedisCacheConfig, RedisCacheStore};
pub use snapshot::Snapshot;
pub use traits::{CacheStats, CacheStore};
