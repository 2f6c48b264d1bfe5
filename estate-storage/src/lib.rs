//! Estate Storage - System of Record and Snapshot Cache
//!
//! Defines the System of Record interface Property data is read from, an
//! in-memory reference implementation, and the read-through snapshot cache
//! kept consistent with it by write-side invalidation.

pub mod cache;
pub mod constants;
mod record;

pub use cache::{
    CacheConfig, CacheMetricsSnapshot, CacheRead, CacheStats, CacheStore, InMemoryCacheStore,
    InvalidationHooks, LmdbCacheError, LmdbCacheStore, MetricsReader, ReadThroughCache, Snapshot,
};
#[cfg(feature = "cache-redis")]
pub use cache::{RedisCacheConfig, RedisCacheStore};
pub use record::{InMemoryPropertyStore, PropertyUpdate, SystemOfRecord};

#[cfg(test)]
mod prop_tests {
    use super::*;
    use estate_core::Property;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn arb_listing() -> impl Strategy<Value = (String, String, i64)> {
        ("[A-Z][a-z]{2,16}", "[A-Z][a-z]{2,12}", 0i64..10_000_000_000)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// The cached collection lists every created property in creation
        /// order, and a repeat read is served from the snapshot.
        #[test]
        fn prop_cached_collection_matches_creation_order(
            listings in prop::collection::vec(arb_listing(), 0..20)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(async {
                let records = Arc::new(InMemoryPropertyStore::new());
                let mut created = Vec::with_capacity(listings.len());
                for (title, location, price) in listings {
                    let property = Property::new(title, "", location, price);
                    created.push(records.create(property).await.unwrap());
                }

                let cache = ReadThroughCache::with_defaults(
                    Arc::new(InMemoryCacheStore::new()),
                    records,
                );
                prop_assert_eq!(cache.get_all_properties().await.unwrap(), created.clone());

                let again = cache.read_all_properties().await.unwrap();
                prop_assert!(again.was_cache_hit());
                prop_assert_eq!(again.into_value(), created);
                Ok(())
            })?;
        }
    }
}
