//! RocksDB storage backend.

use std::path::Path;

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};

use crate::error::StoreError;
use crate::PersistentStore;

/// Column family holding verification records.
const CF_VERIFICATION: &str = "verification";

/// RocksDB-backed store.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a RocksDB database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(
            CF_VERIFICATION,
            Options::default(),
        )];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { db })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(CF_VERIFICATION)
            .ok_or_else(|| StoreError::Backend(format!("column family '{}' not found", CF_VERIFICATION)))
    }
}

#[async_trait]
impl PersistentStore for RocksStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let cf = self.cf()?;
        self.db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let cf = self.cf()?;
        self.db
            .put_cf(cf, key.as_bytes(), value)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let cf = self.cf()?;
        self.db
            .delete_cf(cf, key.as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
