use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StoreError;
use crate::PersistentStore;

/// In-memory store. Survives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.records.get(key).map(|e| e.value().clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.records.insert(key.to_string(), value);
        tracing::trace!(key, "record stored in memory");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records.remove(key);
        Ok(())
    }
}
