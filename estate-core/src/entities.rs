//! Core entity structures

use crate::{new_entity_id, EntityId, EntityType, MutationKind, PropertyId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Property - a listed real-estate record held by the System of Record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Property {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub property_id: PropertyId,
    pub title: String,
    pub description: String,
    pub location: String,
    /// Asking price in minor currency units.
    pub price_cents: i64,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Property {
    /// Create a new property with a fresh UUIDv7 id.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
        price_cents: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            property_id: new_entity_id(),
            title: title.into(),
            description: description.into(),
            location: location.into(),
            price_cents,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Ephemeral signal raised by the System of Record after a mutation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationEvent {
    pub entity_type: EntityType,
    pub kind: MutationKind,
    pub entity_id: EntityId,
    pub occurred_at: Timestamp,
}

impl MutationEvent {
    pub fn new(entity_type: EntityType, kind: MutationKind, entity_id: EntityId) -> Self {
        Self {
            entity_type,
            kind,
            entity_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn property(kind: MutationKind, property: &Property) -> Self {
        Self::new(EntityType::Property, kind, property.property_id)
    }
}

/// List envelope handed to the API layer: `{"properties": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PropertyList {
    pub properties: Vec<Property>,
}

impl From<Vec<Property>> for PropertyList {
    fn from(properties: Vec<Property>) -> Self {
        Self { properties }
    }
}
