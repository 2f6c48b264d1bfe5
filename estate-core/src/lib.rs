//! Estate Core - Entity Types
//!
//! Pure data structures shared by every estate crate: the Property entity,
//! mutation events and the error taxonomy. No cache or storage behavior
//! lives here.

use chrono::{DateTime, Utc};
use uuid::Uuid;

mod entities;
mod enums;
mod error;

pub use entities::{MutationEvent, Property, PropertyList};
pub use enums::{EntityType, MutationKind};
pub use error::{CacheError, ConfigError, EstateError, EstateResult, StorageError};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Property identifier.
pub type PropertyId = EntityId;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}
