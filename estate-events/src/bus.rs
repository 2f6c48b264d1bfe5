//! In-process mutation dispatch.

use async_trait::async_trait;
use estate_core::{EntityType, EstateResult, MutationEvent};
use std::collections::HashMap;
use std::sync::Arc;

/// Handler for committed mutations of one entity type.
///
/// Handlers run inside the mutating call, so they should be short: a cache
/// eviction, a counter bump. Returning an error does not undo the mutation.
#[async_trait]
pub trait MutationSubscriber: Send + Sync {
    /// Called after a create or update commits.
    async fn on_saved(&self, event: &MutationEvent) -> EstateResult<()>;

    /// Called after a delete commits.
    async fn on_deleted(&self, event: &MutationEvent) -> EstateResult<()>;

    /// Name used in log records.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Registry of subscribers keyed by entity type.
///
/// `publish` awaits every subscriber for the event's entity type in
/// registration order. All subscribers run even when one fails; the first
/// error is returned to the publisher.
#[derive(Default)]
pub struct MutationBus {
    subscribers: tokio::sync::RwLock<HashMap<EntityType, Vec<Arc<dyn MutationSubscriber>>>>,
}

impl MutationBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for one entity type.
    pub async fn subscribe(&self, entity_type: EntityType, subscriber: Arc<dyn MutationSubscriber>) {
        tracing::debug!(
            entity_type = %entity_type,
            subscriber = subscriber.name(),
            "Mutation subscriber registered"
        );
        self.subscribers
            .write()
            .await
            .entry(entity_type)
            .or_default()
            .push(subscriber);
    }

    /// Number of subscribers registered for an entity type.
    pub async fn subscriber_count(&self, entity_type: EntityType) -> usize {
        self.subscribers
            .read()
            .await
            .get(&entity_type)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Dispatch an event to the subscribers of its entity type.
    pub async fn publish(&self, event: &MutationEvent) -> EstateResult<()> {
        // Snapshot the list so no lock is held while handlers await.
        let subscribers = {
            let registry = self.subscribers.read().await;
            registry.get(&event.entity_type).cloned().unwrap_or_default()
        };

        let mut first_error = None;
        for subscriber in subscribers {
            let result = if event.kind.is_save() {
                subscriber.on_saved(event).await
            } else {
                subscriber.on_deleted(event).await
            };

            if let Err(e) = result {
                tracing::error!(
                    entity_type = %event.entity_type,
                    kind = %event.kind,
                    entity_id = %event.entity_id,
                    subscriber = subscriber.name(),
                    error = %e,
                    "Mutation subscriber failed"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for MutationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationBus").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::{CacheError, EstateError, MutationKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Default)]
    struct Recorder {
        saved: AtomicUsize,
        deleted: AtomicUsize,
    }

    #[async_trait]
    impl MutationSubscriber for Recorder {
        async fn on_saved(&self, _event: &MutationEvent) -> EstateResult<()> {
            self.saved.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_deleted(&self, _event: &MutationEvent) -> EstateResult<()> {
            self.deleted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl MutationSubscriber for Failing {
        async fn on_saved(&self, _event: &MutationEvent) -> EstateResult<()> {
            Err(CacheError::BackendUnavailable {
                backend: "test".to_string(),
                reason: "down".to_string(),
            }
            .into())
        }

        async fn on_deleted(&self, event: &MutationEvent) -> EstateResult<()> {
            self.on_saved(event).await
        }
    }

    fn event(entity_type: EntityType, kind: MutationKind) -> MutationEvent {
        MutationEvent::new(entity_type, kind, Uuid::now_v7())
    }

    #[tokio::test]
    async fn test_publish_routes_by_kind() {
        let bus = MutationBus::new();
        let recorder = Arc::new(Recorder::default());
        bus.subscribe(EntityType::Property, recorder.clone()).await;

        bus.publish(&event(EntityType::Property, MutationKind::Created))
            .await
            .unwrap();
        bus.publish(&event(EntityType::Property, MutationKind::Updated))
            .await
            .unwrap();
        bus.publish(&event(EntityType::Property, MutationKind::Deleted))
            .await
            .unwrap();

        assert_eq!(recorder.saved.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.deleted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_skips_other_entity_types() {
        let bus = MutationBus::new();
        let recorder = Arc::new(Recorder::default());
        bus.subscribe(EntityType::Property, recorder.clone()).await;

        bus.publish(&event(EntityType::Booking, MutationKind::Created))
            .await
            .unwrap();
        bus.publish(&event(EntityType::Review, MutationKind::Deleted))
            .await
            .unwrap();

        assert_eq!(recorder.saved.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.deleted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = MutationBus::new();
        assert_eq!(bus.subscriber_count(EntityType::Property).await, 0);
        bus.publish(&event(EntityType::Property, MutationKind::Updated))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failing_subscriber_does_not_stop_the_rest() {
        let bus = MutationBus::new();
        let recorder = Arc::new(Recorder::default());
        bus.subscribe(EntityType::Property, Arc::new(Failing)).await;
        bus.subscribe(EntityType::Property, recorder.clone()).await;
        assert_eq!(bus.subscriber_count(EntityType::Property).await, 2);

        let err = bus
            .publish(&event(EntityType::Property, MutationKind::Updated))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EstateError::Cache(CacheError::BackendUnavailable { .. })
        ));
        assert_eq!(recorder.saved.load(Ordering::SeqCst), 1);
    }
}
