//! Error types for estate operations

use crate::EntityType;
use thiserror::Error;
use uuid::Uuid;

/// System of Record errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Fetch failed for {entity_type:?}: {reason}")]
    FetchFailed {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Entity type {entity_type:?} is not held by this store")]
    UnsupportedEntity { entity_type: EntityType },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Cache store errors.
///
/// A miss is never an error: `BackendUnavailable` means the store could not
/// be asked at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend {backend} unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    #[error("Statistics unavailable from {backend}: {reason}")]
    StatsUnavailable { backend: String, reason: String },

    #[error("Snapshot codec error: {reason}")]
    Codec { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all estate errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EstateError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl EstateError {
    /// True when the cache backend could not be reached.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::Cache(CacheError::BackendUnavailable { .. }))
    }

    /// True when the System of Record rejected or failed the operation.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Result type alias for estate operations.
pub type EstateResult<T> = Result<T, EstateError>;
