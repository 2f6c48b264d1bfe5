//! Hit/miss ratios derived from the cache store's counters.

use std::sync::Arc;

use estate_core::EstateError;
use serde::{Deserialize, Serialize};

use super::traits::{CacheStats, CacheStore};
use crate::constants::RATIO_DECIMAL_PLACES;

/// Point-in-time view of cache effectiveness.
///
/// `hit_ratio + miss_ratio == 1.0` whenever `total_operations > 0`; both are
/// zero otherwise. `error` is only present when the backend could not be
/// queried, in which case every counter is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub total_operations: u64,
    pub hit_ratio: f64,
    pub miss_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheMetricsSnapshot {
    /// Derive ratios from raw counters.
    pub fn from_counts(hits: u64, misses: u64) -> Self {
        let total_operations = hits.saturating_add(misses);
        let (hit_ratio, miss_ratio) = if total_operations > 0 {
            let hit_ratio = round_ratio(hits as f64 / total_operations as f64);
            (hit_ratio, round_ratio(1.0 - hit_ratio))
        } else {
            (0.0, 0.0)
        };

        Self {
            hits,
            misses,
            total_operations,
            hit_ratio,
            miss_ratio,
            error: None,
        }
    }

    /// The all-zero snapshot reported when the backend cannot be queried.
    pub fn unavailable(error: &EstateError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<&CacheStats> for CacheMetricsSnapshot {
    fn from(stats: &CacheStats) -> Self {
        Self::from_counts(stats.hits, stats.misses)
    }
}

fn round_ratio(value: f64) -> f64 {
    let scale = 10f64.powi(RATIO_DECIMAL_PLACES);
    (value * scale).round() / scale
}

/// Samples a cache store's counters on demand.
pub struct MetricsReader<C: CacheStore> {
    cache: Arc<C>,
}

impl<C: CacheStore> MetricsReader<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    /// Current hit/miss metrics. Never fails: a backend error yields the
    /// zeroed snapshot with `error` set.
    pub async fn get_cache_metrics(&self) -> CacheMetricsSnapshot {
        match self.cache.stats().await {
            Ok(stats) => {
                let snapshot = CacheMetricsSnapshot::from(&stats);
                tracing::info!(
                    backend = self.cache.backend_name(),
                    hits = snapshot.hits,
                    misses = snapshot.misses,
                    "Cache hit ratio: {:.2}%",
                    snapshot.hit_ratio * 100.0
                );
                snapshot
            }
            Err(e) => {
                tracing::error!(
                    backend = self.cache.backend_name(),
                    error = %e,
                    "Error getting cache metrics"
                );
                CacheMetricsSnapshot::unavailable(&e)
            }
        }
    }
}

impl<C: CacheStore> Clone for MetricsReader<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use proptest::prelude::*;

    #[test]
    fn test_from_counts_rounds_to_four_places() {
        let snapshot = CacheMetricsSnapshot::from_counts(37, 13);
        assert_eq!(snapshot.total_operations, 50);
        assert_eq!(snapshot.hit_ratio, 0.74);
        assert_eq!(snapshot.miss_ratio, 0.26);

        let snapshot = CacheMetricsSnapshot::from_counts(1, 2);
        assert_eq!(snapshot.hit_ratio, 0.3333);
        assert_eq!(snapshot.miss_ratio, 0.6667);
    }

    #[test]
    fn test_zero_traffic_has_zero_ratios() {
        let snapshot = CacheMetricsSnapshot::from_counts(0, 0);
        assert_eq!(snapshot, CacheMetricsSnapshot::default());
    }

    #[test]
    fn test_error_field_omitted_when_absent() {
        let json = serde_json::to_value(CacheMetricsSnapshot::from_counts(3, 1)).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["hit_ratio"], serde_json::json!(0.75));

        let err = EstateError::Cache(estate_core::CacheError::StatsUnavailable {
            backend: "redis".to_string(),
            reason: "NOPERM".to_string(),
        });
        let json = serde_json::to_value(CacheMetricsSnapshot::unavailable(&err)).unwrap();
        assert!(json["error"].as_str().unwrap().contains("NOPERM"));
        assert_eq!(json["total_operations"], serde_json::json!(0));
    }

    #[tokio::test]
    async fn test_reader_samples_store_counters() {
        let reader = MetricsReader::new(Arc::new(InMemoryCacheStore::with_counters(37, 13)));
        let snapshot = reader.get_cache_metrics().await;

        assert_eq!(snapshot, CacheMetricsSnapshot::from_counts(37, 13));
        assert!(!snapshot.is_error());
    }

    proptest! {
        #[test]
        fn prop_ratios_sum_to_one(hits in 0u64..1_000_000, misses in 0u64..1_000_000) {
            let snapshot = CacheMetricsSnapshot::from_counts(hits, misses);
            prop_assert_eq!(snapshot.total_operations, hits + misses);
            if snapshot.total_operations > 0 {
                prop_assert!((snapshot.hit_ratio + snapshot.miss_ratio - 1.0).abs() < 1e-9);
            } else {
                prop_assert_eq!(snapshot.hit_ratio, 0.0);
                prop_assert_eq!(snapshot.miss_ratio, 0.0);
            }
            prop_assert!((0.0..=1.0).contains(&snapshot.hit_ratio));
        }
    }
}
