//! Read-through accessor for the Property collection snapshot.
//!
//! The whole collection lives under one cache key. A read returns the cached
//! snapshot when one is live, otherwise it fetches the collection from the
//! System of Record and stores it with the configured TTL. Invalidation is
//! driven from the write side (see [`super::invalidation`]), so a live
//! snapshot is at most one TTL old and never older than the last mutation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use estate_core::{ConfigError, EntityType, EstateResult, Property};
use tokio::sync::Mutex;

use super::freshness::CacheRead;
use super::invalidation::InvalidationHooks;
use super::snapshot::Snapshot;
use super::traits::CacheStore;
use crate::constants::{
    DEFAULT_SINGLE_FLIGHT, DEFAULT_SNAPSHOT_KEY, DEFAULT_SNAPSHOT_TTL_SECS, ENV_SINGLE_FLIGHT,
    ENV_SNAPSHOT_KEY, ENV_SNAPSHOT_TTL_SECS,
};
use crate::record::SystemOfRecord;

/// Configuration for the read-through accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Key the collection snapshot is stored under.
    pub snapshot_key: String,
    /// Lifetime of a stored snapshot.
    pub snapshot_ttl: Duration,
    /// Entity type fetched on a miss and watched for invalidation.
    watched_entity: EntityType,
    /// Serialize concurrent misses so one fetch serves every waiter.
    pub single_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            snapshot_ttl: Duration::from_secs(DEFAULT_SNAPSHOT_TTL_SECS),
            watched_entity: EntityType::Property,
            single_flight: DEFAULT_SINGLE_FLIGHT,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    /// Set the snapshot TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl = ttl;
        self
    }

    /// Entity type the snapshot materializes.
    pub fn watched_entity(&self) -> EntityType {
        self.watched_entity
    }

    /// Enable or disable single-flight population.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Create CacheConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ESTATE_CACHE_SNAPSHOT_KEY`: cache key (default: `all_properties`)
    /// - `ESTATE_CACHE_SNAPSHOT_TTL_SECS`: snapshot TTL (default: 3600)
    /// - `ESTATE_CACHE_SINGLE_FLIGHT`: `true`/`1` to coalesce misses (default: false)
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let snapshot_key =
            lookup(ENV_SNAPSHOT_KEY).unwrap_or_else(|| DEFAULT_SNAPSHOT_KEY.to_string());

        let snapshot_ttl = Duration::from_secs(
            lookup(ENV_SNAPSHOT_TTL_SECS)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_SNAPSHOT_TTL_SECS),
        );

        let single_flight = lookup(ENV_SINGLE_FLIGHT)
            .and_then(|s| parse_flag(&s))
            .unwrap_or(DEFAULT_SINGLE_FLIGHT);

        Self {
            snapshot_key,
            snapshot_ttl,
            watched_entity: EntityType::Property,
            single_flight,
        }
    }

    /// Reject configurations the accessor cannot honor.
    pub fn validate(&self) -> EstateResult<()> {
        if self.snapshot_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "snapshot_key".to_string(),
                value: self.snapshot_key.clone(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if self.snapshot_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "snapshot_ttl".to_string(),
                value: format!("{:?}", self.snapshot_ttl),
                reason: "must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read-through cache over the Property collection.
///
/// # Type Parameters
///
/// - `C`: The cache store holding the snapshot
/// - `S`: The System of Record consulted on a miss
///
/// # Example
///
/// ```ignore
/// let cache = ReadThroughCache::new(store, records, CacheConfig::from_env());
/// let properties = cache.get_all_properties().await?;
/// ```
pub struct ReadThroughCache<C, S>
where
    C: CacheStore,
    S: SystemOfRecord,
{
    cache: Arc<C>,
    records: Arc<S>,
    config: CacheConfig,
    /// Held while a miss is being populated when single-flight is on.
    populate_lock: Arc<Mutex<()>>,
}

impl<C, S> ReadThroughCache<C, S>
where
    C: CacheStore,
    S: SystemOfRecord,
{
    /// Create a new read-through cache.
    pub fn new(cache: Arc<C>, records: Arc<S>, config: CacheConfig) -> Self {
        Self {
            cache,
            records,
            config,
            populate_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a new read-through cache with default configuration.
    pub fn with_defaults(cache: Arc<C>, records: Arc<S>) -> Self {
        Self::new(cache, records, CacheConfig::default())
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the cache store.
    pub fn store(&self) -> &C {
        &self.cache
    }

    /// Invalidation hooks evicting this accessor's snapshot key.
    pub fn invalidation_hooks(&self) -> InvalidationHooks<C> {
        InvalidationHooks::from_config(Arc::clone(&self.cache), &self.config)
    }

    /// Return the full Property collection, from cache when a snapshot is live.
    ///
    /// # Errors
    ///
    /// System of Record failures propagate and leave the cache unset. Cache
    /// store failures on lookup or population propagate as well.
    pub async fn get_all_properties(&self) -> EstateResult<Vec<Property>> {
        self.read_all_properties().await.map(CacheRead::into_value)
    }

    /// Same protocol as [`Self::get_all_properties`], reporting whether the
    /// result came from the cache and when it was materialized.
    pub async fn read_all_properties(&self) -> EstateResult<CacheRead<Vec<Property>>> {
        if let Some(read) = self.lookup().await? {
            return Ok(read);
        }

        if !self.config.single_flight {
            return self.populate().await;
        }

        let _guard = match self.populate_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                let guard = self.populate_lock.lock().await;
                // Whoever held the lock has likely stored a snapshot by now.
                if let Some(read) = self.lookup().await? {
                    return Ok(read);
                }
                guard
            }
        };
        self.populate().await
    }

    /// Evict the snapshot. Evicting an absent snapshot is a no-op.
    pub async fn invalidate(&self) -> EstateResult<()> {
        let key = self.config.snapshot_key.as_str();
        self.cache.delete(key).await.inspect_err(|e| {
            tracing::error!(
                key,
                backend = self.cache.backend_name(),
                error = %e,
                "Snapshot eviction failed"
            );
        })?;
        tracing::debug!(key, "Snapshot evicted");
        Ok(())
    }

    async fn lookup(&self) -> EstateResult<Option<CacheRead<Vec<Property>>>> {
        let key = self.config.snapshot_key.as_str();

        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::error!(
                    key,
                    backend = self.cache.backend_name(),
                    error = %e,
                    "Snapshot lookup failed"
                );
                return Err(e);
            }
        };

        match Snapshot::<Property>::decode(&bytes) {
            Ok(snapshot) => {
                let read = CacheRead::from_cache(snapshot.records, snapshot.cached_at);
                tracing::debug!(
                    key,
                    count = read.value().len(),
                    age_secs = read.staleness().as_secs(),
                    "Snapshot served from cache"
                );
                Ok(Some(read))
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable snapshot");
                self.cache.delete(key).await?;
                Ok(None)
            }
        }
    }

    async fn populate(&self) -> EstateResult<CacheRead<Vec<Property>>> {
        let key = self.config.snapshot_key.as_str();

        let records = self.records.fetch_all(self.config.watched_entity()).await?;
        let snapshot = Snapshot::new(records, Utc::now());
        let bytes = snapshot.encode()?;

        if let Err(e) = self.cache.set(key, &bytes, self.config.snapshot_ttl).await {
            tracing::error!(
                key,
                backend = self.cache.backend_name(),
                error = %e,
                "Snapshot store failed"
            );
            return Err(e);
        }

        tracing::debug!(
            key,
            count = snapshot.records.len(),
            ttl_seconds = self.config.snapshot_ttl.as_secs(),
            "Snapshot populated from System of Record"
        );
        Ok(CacheRead::from_storage(snapshot.records, snapshot.cached_at))
    }
}

impl<C, S> Clone for ReadThroughCache<C, S>
where
    C: CacheStore,
    S: SystemOfRecord,
{
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            records: Arc::clone(&self.records),
            config: self.config.clone(),
            populate_lock: Arc::clone(&self.populate_lock),
        }
    }
}
