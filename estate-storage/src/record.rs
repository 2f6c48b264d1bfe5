//! System of Record interface and in-memory reference store.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use estate_core::{
    EntityType, EstateResult, MutationEvent, MutationKind, Property, PropertyId, StorageError,
};
use estate_events::{MutationBus, MutationSubscriber};

// ============================================================================
// SYSTEM OF RECORD TRAIT
// ============================================================================

/// Authoritative store for Property records.
///
/// Implementations must publish a mutation event to subscribers of the
/// entity type after every committed create, update or delete, and must not
/// return from the mutating call until those subscribers have run.
#[async_trait]
pub trait SystemOfRecord: Send + Sync {
    /// Fetch every record of an entity type.
    async fn fetch_all(&self, entity_type: EntityType) -> EstateResult<Vec<Property>>;

    /// Register a subscriber for mutations of one entity type.
    async fn subscribe(&self, entity_type: EntityType, subscriber: Arc<dyn MutationSubscriber>);
}

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for properties.
#[derive(Debug, Clone, Default)]
pub struct PropertyUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price_cents: Option<i64>,
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// In-memory System of Record.
///
/// Records are kept ordered by id, and ids are UUIDv7, so `fetch_all`
/// returns properties in creation order.
#[derive(Debug, Default)]
pub struct InMemoryPropertyStore {
    properties: RwLock<BTreeMap<PropertyId, Property>>,
    bus: MutationBus,
}

impl InMemoryPropertyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bus this store publishes on.
    pub fn bus(&self) -> &MutationBus {
        &self.bus
    }

    /// Number of stored properties.
    pub fn count(&self) -> EstateResult<usize> {
        let properties = self.properties.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(properties.len())
    }

    /// Get a property by id.
    pub fn get(&self, id: PropertyId) -> EstateResult<Option<Property>> {
        let properties = self.properties.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(properties.get(&id).cloned())
    }

    /// Insert a new property, then notify subscribers.
    pub async fn create(&self, property: Property) -> EstateResult<Property> {
        {
            let mut properties = self
                .properties
                .write()
                .map_err(|_| StorageError::LockPoisoned)?;
            if properties.contains_key(&property.property_id) {
                return Err(StorageError::InsertFailed {
                    entity_type: EntityType::Property,
                    reason: "already exists".to_string(),
                }
                .into());
            }
            properties.insert(property.property_id, property.clone());
        }

        self.bus
            .publish(&MutationEvent::property(MutationKind::Created, &property))
            .await?;
        Ok(property)
    }

    /// Apply an update, then notify subscribers.
    pub async fn update(&self, id: PropertyId, update: PropertyUpdate) -> EstateResult<Property> {
        let updated = {
            let mut properties = self
                .properties
                .write()
                .map_err(|_| StorageError::LockPoisoned)?;
            let property = properties.get_mut(&id).ok_or(StorageError::NotFound {
                entity_type: EntityType::Property,
                id,
            })?;

            if let Some(title) = update.title {
                property.title = title;
            }
            if let Some(description) = update.description {
                property.description = description;
            }
            if let Some(location) = update.location {
                property.location = location;
            }
            if let Some(price_cents) = update.price_cents {
                property.price_cents = price_cents;
            }
            property.updated_at = Utc::now();
            property.clone()
        };

        self.bus
            .publish(&MutationEvent::property(MutationKind::Updated, &updated))
            .await?;
        Ok(updated)
    }

    /// Remove a property, then notify subscribers.
    pub async fn delete(&self, id: PropertyId) -> EstateResult<Property> {
        let removed = {
            let mut properties = self
                .properties
                .write()
                .map_err(|_| StorageError::LockPoisoned)?;
            properties.remove(&id).ok_or(StorageError::NotFound {
                entity_type: EntityType::Property,
                id,
            })?
        };

        self.bus
            .publish(&MutationEvent::property(MutationKind::Deleted, &removed))
            .await?;
        Ok(removed)
    }
}

#[async_trait]
impl SystemOfRecord for InMemoryPropertyStore {
    async fn fetch_all(&self, entity_type: EntityType) -> EstateResult<Vec<Property>> {
        if entity_type != EntityType::Property {
            return Err(StorageError::UnsupportedEntity { entity_type }.into());
        }
        let properties = self.properties.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(properties.values().cloned().collect())
    }

    async fn subscribe(&self, entity_type: EntityType, subscriber: Arc<dyn MutationSubscriber>) {
        self.bus.subscribe(entity_type, subscriber).await;
    }
}
