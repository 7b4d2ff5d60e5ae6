//! AgeGate Store — local persistence for verification results.
//!
//! Nothing here talks to the network: every backend writes to this device
//! only.

pub mod error;
pub mod file;
pub mod history;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;

use async_trait::async_trait;

pub use error::StoreError;
pub use file::FileStore;
pub use history::{ResultStore, StoredHistory, HISTORY_KEY_PREFIX};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksStore;

/// Durable key-value store on the local device.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
