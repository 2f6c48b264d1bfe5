//! Write-side eviction of the collection snapshot.
//!
//! Any committed create, update or delete of a Property makes the cached
//! collection stale, so the hooks drop the whole snapshot. The System of
//! Record awaits subscribers before the mutating call returns, which means a
//! caller that has seen its write succeed will never be served the old
//! snapshot afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use estate_core::{EntityType, EstateResult, MutationEvent, Property, PropertyId};
use estate_events::MutationSubscriber;

use super::read_through::CacheConfig;
use super::traits::CacheStore;
use crate::constants::DEFAULT_SNAPSHOT_KEY;
use crate::record::SystemOfRecord;

/// Evicts the snapshot whenever a Property changes.
///
/// The hooks must evict the key the accessor stores under. Build them with
/// [`InvalidationHooks::from_config`] or
/// [`ReadThroughCache::invalidation_hooks`](super::ReadThroughCache::invalidation_hooks)
/// so the two cannot drift apart.
pub struct InvalidationHooks<C: CacheStore> {
    cache: Arc<C>,
    snapshot_key: String,
    entity_type: EntityType,
}

impl<C: CacheStore> InvalidationHooks<C> {
    /// Hooks evicting the default snapshot key.
    pub fn new(cache: Arc<C>) -> Self {
        Self::with_key(cache, DEFAULT_SNAPSHOT_KEY)
    }

    /// Hooks evicting a custom key.
    pub fn with_key(cache: Arc<C>, snapshot_key: impl Into<String>) -> Self {
        Self {
            cache,
            snapshot_key: snapshot_key.into(),
            entity_type: EntityType::Property,
        }
    }

    /// Hooks matching an accessor's key and watched entity type.
    pub fn from_config(cache: Arc<C>, config: &CacheConfig) -> Self {
        Self {
            cache,
            snapshot_key: config.snapshot_key.clone(),
            entity_type: config.watched_entity(),
        }
    }

    pub fn snapshot_key(&self) -> &str {
        &self.snapshot_key
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Subscribe these hooks to mutations of the watched entity type.
    pub async fn register<S>(self: Arc<Self>, records: &S)
    where
        S: SystemOfRecord + ?Sized,
        C: 'static,
    {
        let entity_type = self.entity_type;
        records.subscribe(entity_type, self).await;
        tracing::debug!(%entity_type, "Snapshot invalidation hooks registered");
    }

    /// Called after a Property create or update completes.
    pub async fn on_property_saved(&self, property: &Property) -> EstateResult<()> {
        self.evict(property, "saved").await
    }

    /// Called after a Property is removed.
    pub async fn on_property_deleted(&self, property: &Property) -> EstateResult<()> {
        self.evict(property, "deleted").await
    }

    async fn evict(&self, property: &Property, cause: &'static str) -> EstateResult<()> {
        self.evict_for(property.property_id, cause).await
    }

    async fn evict_for(&self, property_id: PropertyId, cause: &'static str) -> EstateResult<()> {
        let key = self.snapshot_key.as_str();
        match self.cache.delete(key).await {
            Ok(()) => {
                tracing::debug!(key, %property_id, cause, "Snapshot invalidated");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    key,
                    %property_id,
                    cause,
                    backend = self.cache.backend_name(),
                    error = %e,
                    "Snapshot invalidation failed"
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<C: CacheStore> MutationSubscriber for InvalidationHooks<C> {
    async fn on_saved(&self, event: &MutationEvent) -> EstateResult<()> {
        if event.entity_type != self.entity_type {
            return Ok(());
        }
        self.evict_for(event.entity_id, "saved").await
    }

    async fn on_deleted(&self, event: &MutationEvent) -> EstateResult<()> {
        if event.entity_type != self.entity_type {
            return Ok(());
        }
        self.evict_for(event.entity_id, "deleted").await
    }

    fn name(&self) -> &str {
        "snapshot-invalidation"
    }
}

impl<C: CacheStore> std::fmt::Debug for InvalidationHooks<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationHooks")
            .field("backend", &self.cache.backend_name())
            .field("snapshot_key", &self.snapshot_key)
            .field("entity_type", &self.entity_type)
            .finish()
    }
}
