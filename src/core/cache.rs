//! Cache abstractions shared by the in-memory and on-disk stores.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A named collection of string keys to serialized values with optional expiry.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>);
    async fn remove(&self, key: &str);
    async fn clear(&self);
}

/// Hands out collections by name, either memory-backed or persisted.
pub trait Store: Send + Sync {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>>;
}

/// Reads a JSON value from a collection. Entries that no longer deserialize
/// are treated as misses.
pub async fn get_json<V: DeserializeOwned>(
    collection: &dyn KeyValueCollection,
    key: &str,
) -> Option<V> {
    let raw = collection.get(key).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Discarding undecodable cache entry for {}: {}", key, e);
            None
        }
    }
}

pub async fn put_json<V: Serialize>(
    collection: &dyn KeyValueCollection,
    key: &str,
    value: &V,
    ttl: Option<Duration>,
) {
    match serde_json::to_string(value) {
        Ok(raw) => collection.put(key, raw, ttl).await,
        Err(e) => debug!("Skipping cache write for {}: {}", key, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCollection;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        value: f64,
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let collection = MemoryCollection::new();
        let sample = Sample {
            name: "AAPL".to_string(),
            value: 1.5,
        };

        put_json(&collection, "k", &sample, None).await;
        let loaded: Option<Sample> = get_json(&collection, "k").await;
        assert_eq!(loaded, Some(sample));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let collection = MemoryCollection::new();
        collection.put("k", "not json".to_string(), None).await;

        let loaded: Option<Sample> = get_json(&collection, "k").await;
        assert!(loaded.is_none());
    }
}
