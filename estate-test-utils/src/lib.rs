//! Estate Test Utilities
//!
//! Centralized test infrastructure for the estate workspace:
//! - Proptest generators for Property data
//! - Instrumented and failure-injecting System of Record and cache fakes
//! - Test fixtures for common scenarios
//! - Custom assertions for estate error variants
//! - Tracing setup for tests

// Re-export core types for convenience
pub use estate_core::{
    CacheError, EntityType, EstateError, EstateResult, MutationEvent, MutationKind, Property,
    PropertyId, PropertyList, StorageError, Timestamp,
};
pub use estate_storage::{
    CacheStats, CacheStore, InMemoryCacheStore, InMemoryPropertyStore, PropertyUpdate,
    SystemOfRecord,
};

use async_trait::async_trait;
use estate_events::{MutationBus, MutationSubscriber};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// SYSTEM OF RECORD FAKES
// ============================================================================

/// Wraps a System of Record and counts `fetch_all` calls.
///
/// An optional delay is applied before each fetch so concurrent readers can
/// overlap inside the fetch. Use it under paused time.
#[derive(Debug)]
pub struct CountingRecordStore<S: SystemOfRecord> {
    inner: Arc<S>,
    fetches: AtomicUsize,
    delay: Option<Duration>,
}

impl<S: SystemOfRecord> CountingRecordStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `fetch_all` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: SystemOfRecord> SystemOfRecord for CountingRecordStore<S> {
    async fn fetch_all(&self, entity_type: EntityType) -> EstateResult<Vec<Property>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.fetch_all(entity_type).await
    }

    async fn subscribe(&self, entity_type: EntityType, subscriber: Arc<dyn MutationSubscriber>) {
        self.inner.subscribe(entity_type, subscriber).await;
    }
}

/// System of Record whose reads always fail.
#[derive(Debug, Default)]
pub struct FailingRecordStore {
    bus: MutationBus,
    fetches: AtomicUsize,
}

impl FailingRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SystemOfRecord for FailingRecordStore {
    async fn fetch_all(&self, entity_type: EntityType) -> EstateResult<Vec<Property>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::FetchFailed {
            entity_type,
            reason: "connection reset by peer".to_string(),
        }
        .into())
    }

    async fn subscribe(&self, entity_type: EntityType, subscriber: Arc<dyn MutationSubscriber>) {
        self.bus.subscribe(entity_type, subscriber).await;
    }
}

// ============================================================================
// CACHE STORE FAKES
// ============================================================================

/// Cache store that cannot be reached.
#[derive(Debug, Default, Clone)]
pub struct UnreachableCacheStore;

impl UnreachableCacheStore {
    fn error() -> EstateError {
        CacheError::BackendUnavailable {
            backend: "unreachable".to_string(),
            reason: "connection refused".to_string(),
        }
        .into()
    }
}

#[async_trait]
impl CacheStore for UnreachableCacheStore {
    async fn get(&self, _key: &str) -> EstateResult<Option<Vec<u8>>> {
        Err(Self::error())
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> EstateResult<()> {
        Err(Self::error())
    }

    async fn delete(&self, _key: &str) -> EstateResult<()> {
        Err(Self::error())
    }

    async fn stats(&self) -> EstateResult<CacheStats> {
        Err(Self::error())
    }

    fn backend_name(&self) -> &'static str {
        "unreachable"
    }
}

/// Working in-memory store that refuses statistics queries.
#[derive(Debug, Default)]
pub struct StatsDeniedStore {
    inner: InMemoryCacheStore,
}

impl StatsDeniedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for StatsDeniedStore {
    async fn get(&self, key: &str) -> EstateResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> EstateResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> EstateResult<()> {
        self.inner.delete(key).await
    }

    async fn stats(&self) -> EstateResult<CacheStats> {
        Err(CacheError::StatsUnavailable {
            backend: "stats-denied".to_string(),
            reason: "NOPERM this user has no permissions to run the 'info' command".to_string(),
        }
        .into())
    }

    fn backend_name(&self) -> &'static str {
        "stats-denied"
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating estate data.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a valid UUIDv7 (timestamp-sortable).
    pub fn arb_property_id() -> impl Strategy<Value = PropertyId> {
        Just(()).prop_map(|_| Uuid::now_v7())
    }

    /// Generate timestamps within a reasonable range (2020-2030).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    /// Generate an EntityType variant.
    pub fn arb_entity_type() -> impl Strategy<Value = EntityType> {
        prop_oneof![
            Just(EntityType::Property),
            Just(EntityType::Booking),
            Just(EntityType::Review),
            Just(EntityType::User),
        ]
    }

    /// Generate a MutationKind variant.
    pub fn arb_mutation_kind() -> impl Strategy<Value = MutationKind> {
        prop_oneof![
            Just(MutationKind::Created),
            Just(MutationKind::Updated),
            Just(MutationKind::Deleted),
        ]
    }

    /// Generate a Property with a fresh id.
    pub fn arb_property() -> impl Strategy<Value = Property> {
        (
            arb_property_id(),
            "[A-Z][a-z]{2,12}( [A-Z][a-z]{2,12})?",
            ".{0,80}",
            "[A-Z][a-z]{3,12}",
            0i64..5_000_000_000,
            arb_timestamp(),
        )
            .prop_map(
                |(property_id, title, description, location, price_cents, created_at)| Property {
                    property_id,
                    title,
                    description,
                    location,
                    price_cents,
                    created_at,
                    updated_at: created_at,
                },
            )
    }

    /// Generate a PropertyUpdate touching any subset of fields.
    pub fn arb_property_update() -> impl Strategy<Value = PropertyUpdate> {
        (
            proptest::option::of("[A-Z][a-z]{2,12}"),
            proptest::option::of(".{0,40}"),
            proptest::option::of("[A-Z][a-z]{3,12}"),
            proptest::option::of(0i64..5_000_000_000),
        )
            .prop_map(|(title, description, location, price_cents)| PropertyUpdate {
                title,
                description,
                location,
                price_cents,
            })
    }

    /// Generate a mutation event for any entity type.
    pub fn arb_mutation_event() -> impl Strategy<Value = MutationEvent> {
        (arb_entity_type(), arb_mutation_kind(), arb_property_id())
            .prop_map(|(entity_type, kind, id)| MutationEvent::new(entity_type, kind, id))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// Create a property with the given title and fixed other fields.
    pub fn make_property(title: &str) -> Property {
        Property::new(title, "Test listing", "Nairobi", 150_000_00)
    }

    /// Three distinct properties.
    pub fn three_properties() -> Vec<Property> {
        vec![
            Property::new("Garden Cottage", "Two bedrooms", "Karen", 95_000_00),
            Property::new("City Loft", "Open plan", "Westlands", 130_000_00),
            Property::new("Beach House", "Sea view", "Diani", 420_000_00),
        ]
    }

    /// A System of Record already holding `properties`.
    pub async fn seeded_record_store(properties: Vec<Property>) -> Arc<InMemoryPropertyStore> {
        let store = Arc::new(InMemoryPropertyStore::new());
        for property in properties {
            if let Err(e) = store.create(property).await {
                panic!("fixture insert failed: {}", e);
            }
        }
        store
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for estate-specific validation.

    use super::*;

    /// Assert that an EstateResult is a cache backend outage.
    #[track_caller]
    pub fn assert_backend_unavailable<T: std::fmt::Debug>(result: &EstateResult<T>) {
        match result {
            Err(EstateError::Cache(CacheError::BackendUnavailable { .. })) => {}
            other => panic!("Expected BackendUnavailable, got: {:?}", other),
        }
    }

    /// Assert that an EstateResult is a System of Record error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &EstateResult<T>) {
        match result {
            Err(EstateError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TRACING
// ============================================================================

/// Install a fmt subscriber writing through the test harness.
///
/// Honors `RUST_LOG`; defaults to debug for the estate crates. Safe to call
/// from every test.
pub fn init_test_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("estate_storage=debug,estate_events=debug,warn"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
