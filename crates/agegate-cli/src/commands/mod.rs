pub mod clear;
pub mod history;
pub mod init;
pub mod proof;
pub mod stats;
pub mod status;
pub mod verify;

use std::sync::Arc;

use serde::Serialize;

use agegate_core::DeviceId;
use agegate_engine::{Backends, VerificationEngine};
use agegate_factors::SimulatedDevice;
use agegate_store::{FileStore, MemoryStore, PersistentStore};

use crate::config::{AgeGateConfig, StorageBackend};

/// Build the engine described by `config` and restore its history.
pub async fn open_engine(config: &AgeGateConfig) -> anyhow::Result<VerificationEngine> {
    let device_id = match &config.device.device_id {
        Some(id) => DeviceId::new(id.as_str())?,
        None => {
            let id = DeviceId::generate();
            tracing::warn!(
                %id,
                "no device_id configured, history is not kept across runs; run `agegate init`"
            );
            id
        }
    };

    let mut device = SimulatedDevice::new();
    for (key, value) in &config.device.settings {
        device = device.with_setting(key.as_str(), value.as_str());
    }
    if config.device.usage_history {
        device = device.with_usage(SimulatedDevice::established_usage());
    }

    let store = open_store(config)?;
    let engine = VerificationEngine::open(
        config.engine.clone(),
        device_id,
        Backends::simulated(Arc::new(device), store),
    )
    .await?;
    Ok(engine)
}

fn open_store(config: &AgeGateConfig) -> anyhow::Result<Arc<dyn PersistentStore>> {
    let data_dir = &config.storage.data_dir;
    let store: Arc<dyn PersistentStore> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::open(data_dir)?),
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => Arc::new(agegate_store::RocksStore::open(data_dir)?),
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => {
            anyhow::bail!("rocksdb backend requires building agegate with the `rocksdb` feature")
        }
    };
    tracing::debug!(
        backend = ?config.storage.backend,
        data_dir = %data_dir.display(),
        "store opened"
    );
    Ok(store)
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
