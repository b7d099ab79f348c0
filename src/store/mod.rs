pub mod disk;
pub mod memory;

use crate::core::cache::{KeyValueCollection, Store};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::path::Path;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::{debug, warn};

/// A thread-safe key-value store that can hold multiple collections.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Arc<Keyspace>>,
}

impl KeyValueStore {
    /// Opens a store whose persistent collections live under `data_path/cache`.
    /// If the keyspace cannot be opened the store still serves memory collections.
    pub fn open(data_path: &Path) -> Self {
        let cache_dir = data_path.join("cache");
        let keyspace = match fjall::Config::new(&cache_dir).open() {
            Ok(ks) => Some(Arc::new(ks)),
            Err(e) => {
                warn!(
                    "Could not open cache at {}: {}. Falling back to memory.",
                    cache_dir.display(),
                    e
                );
                None
            }
        };

        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    /// A store without a keyspace. Every collection is memory-backed.
    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }

    fn create_collection(&self, name: &str, persist: bool) -> Option<Arc<dyn KeyValueCollection>> {
        if !persist {
            return Some(Arc::new(MemoryCollection::new()));
        }

        let keyspace = self.keyspace.as_ref()?;
        match keyspace.open_partition(name, PartitionCreateOptions::default()) {
            Ok(partition) => Some(Arc::new(DiskCollection::new(
                Arc::clone(keyspace),
                partition,
            ))),
            Err(e) => {
                debug!("Failed to open partition {}: {}", name, e);
                None
            }
        }
    }
}

impl Default for KeyValueStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Store for KeyValueStore {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>> {
        if let Some(existing) = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Some(Arc::clone(existing));
        }

        if !create_if_missing {
            return None;
        }

        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = collections.get(name) {
            return Some(Arc::clone(existing));
        }

        // Failed to create persistent collection
        let collection = self.create_collection(name, persist)?;
        collections.insert(name.to_string(), Arc::clone(&collection));
        Some(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_memory_collection_is_shared_by_name() {
        let store = KeyValueStore::in_memory();
        let first = store.get_collection("quotes", false, true).unwrap();
        first.put("AAPL", "1".to_string(), None).await;

        let second = store.get_collection("quotes", false, false).unwrap();
        assert_eq!(second.get("AAPL").await.as_deref(), Some("1"));
    }

    #[test]
    fn test_missing_collection_without_create() {
        let store = KeyValueStore::in_memory();
        assert!(store.get_collection("quotes", false, false).is_none());
    }

    #[test]
    fn test_persistent_collection_requires_keyspace() {
        let store = KeyValueStore::in_memory();
        assert!(store.get_collection("quotes", true, true).is_none());
    }

    #[tokio::test]
    async fn test_persistent_collection_on_disk() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path());

        let collection = store.get_collection("company_data", true, true).unwrap();
        collection.put("MSFT", "payload".to_string(), None).await;
        assert_eq!(collection.get("MSFT").await.as_deref(), Some("payload"));
        assert!(dir.path().join("cache").exists());
    }
}
