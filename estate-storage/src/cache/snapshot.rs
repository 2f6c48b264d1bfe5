//! Serialized form of the collection snapshot.

use chrono::{DateTime, Utc};
use estate_core::{CacheError, EstateResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Materialized collection stored under the snapshot key.
///
/// The envelope records when the collection was fetched from the System of
/// Record so a later hit can report how old it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub cached_at: DateTime<Utc>,
    pub records: Vec<T>,
}

impl<T> Snapshot<T> {
    pub fn new(records: Vec<T>, cached_at: DateTime<Utc>) -> Self {
        Self { cached_at, records }
    }
}

impl<T: Serialize> Snapshot<T> {
    /// Serialize to the bytes handed to the cache store.
    pub fn encode(&self) -> EstateResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            CacheError::Codec {
                reason: format!("snapshot encode failed: {}", e),
            }
            .into()
        })
    }
}

impl<T: DeserializeOwned> Snapshot<T> {
    /// Parse bytes read back from the cache store.
    pub fn decode(bytes: &[u8]) -> EstateResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            CacheError::Codec {
                reason: format!("snapshot decode failed: {}", e),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::{EstateError, Property};

    #[test]
    fn test_envelope_layout() {
        let cached_at = Utc::now();
        let snapshot = Snapshot::new(vec![1u32, 2, 3], cached_at);
        let json: serde_json::Value =
            serde_json::from_slice(&snapshot.encode().unwrap()).unwrap();

        assert_eq!(json["records"], serde_json::json!([1, 2, 3]));
        assert!(json["cached_at"].is_string());
    }

    #[test]
    fn test_decode_preserves_properties() {
        let properties = vec![
            Property::new("Cottage", "Garden", "Mombasa", 90_000_00),
            Property::new("Flat", "Balcony", "Kisumu", 45_000_00),
        ];
        let snapshot = Snapshot::new(properties.clone(), Utc::now());

        let decoded = Snapshot::<Property>::decode(&snapshot.encode().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.records, properties);
    }

    #[test]
    fn test_decode_garbage_is_codec_error() {
        let err = Snapshot::<Property>::decode(b"not json").unwrap_err();
        assert!(matches!(err, EstateError::Cache(CacheError::Codec { .. })));
    }
}
