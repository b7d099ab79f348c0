use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    value: String,
    expires_at: Option<SystemTime>,
}

/// A collection persisted in a fjall partition, so entries outlive the process
/// until their expiry passes.
pub struct DiskCollection {
    keyspace: Arc<Keyspace>,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Arc<Keyspace>, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let Some(raw) = self.partition.get(key)? else {
            debug!("Cache MISS for key: {}", key);
            return Ok(None);
        };

        let entry: CacheEntry = serde_json::from_slice(&raw)?;
        if let Some(expires_at) = entry.expires_at {
            if SystemTime::now() > expires_at {
                debug!("Cache entry expired for key: {}", key);
                self.partition.remove(key)?;
                return Ok(None);
            }
        }
        debug!("Cache HIT for key: {}", key);
        Ok(Some(entry.value))
    }

    fn write(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|d| SystemTime::now() + d),
        };
        self.partition.insert(key, serde_json::to_vec(&entry)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Cache PUT for key: {}", key);
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        let keys = self
            .partition
            .keys()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for key in keys {
            self.partition.remove(key)?;
        }
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &str) -> Option<String> {
        match self.read(key) {
            Ok(val) => val,
            Err(e) => {
                debug!("DiskCollection get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) {
        if let Err(e) = self.write(key, value, ttl) {
            debug!("DiskCollection put error: {}", e);
        }
    }

    async fn remove(&self, key: &str) {
        let res = self
            .partition
            .remove(key)
            .and_then(|_| self.keyspace.persist(PersistMode::SyncAll));
        if let Err(e) = res {
            debug!("DiskCollection remove error: {}", e);
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.remove_all() {
            debug!("DiskCollection clear error: {}", e)
        }
    }
}
