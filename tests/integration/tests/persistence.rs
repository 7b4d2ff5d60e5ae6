//! Integration test: verification history on durable local storage.

mod common;

use std::sync::Arc;

use agegate_core::VerificationMethod;
use agegate_engine::VerificationOptions;
use agegate_store::{FileStore, MemoryStore, PersistentStore, ResultStore, StoredHistory};
use common::{flagged_device, temp_dir, FailingStore, Harness};

fn device_settings() -> VerificationOptions {
    VerificationOptions::new(VerificationMethod::DeviceSettings)
}

#[tokio::test]
async fn test_history_survives_reopen_on_file_store() {
    let dir = temp_dir();
    let store: Arc<dyn PersistentStore> = Arc::new(FileStore::open(&dir).unwrap());

    let first = Harness::new(flagged_device())
        .store(Arc::clone(&store))
        .open()
        .await;
    let attempt = first.start_verification(device_settings()).await.unwrap();
    drop(first);

    let reopened_store: Arc<dyn PersistentStore> = Arc::new(FileStore::open(&dir).unwrap());
    let reopened = Harness::new(flagged_device())
        .store(reopened_store)
        .open()
        .await;
    let history = reopened.verification_history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], attempt);
    assert_eq!(
        reopened.verification_proof().await.map(|p| p.proof),
        attempt.proof
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_durable_record_is_keyed_by_device() {
    let store = Arc::new(MemoryStore::new());
    let engine = Harness::new(flagged_device())
        .device_id("device_alpha")
        .store(store.clone())
        .open()
        .await;
    engine.start_verification(device_settings()).await.unwrap();

    assert!(store.contains("age_verification:device_alpha"));
    let bytes = store
        .get("age_verification:device_alpha")
        .await
        .unwrap()
        .unwrap();
    let stored: StoredHistory = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stored.device_id.as_str(), "device_alpha");
    assert_eq!(stored.attempts.len(), 1);

    let other = Harness::new(flagged_device())
        .device_id("device_beta")
        .store(store.clone())
        .open()
        .await;
    assert!(other.verification_history().await.is_empty());
}

#[tokio::test]
async fn test_clear_wipes_memory_and_disk() {
    let dir = temp_dir();
    let store: Arc<dyn PersistentStore> = Arc::new(FileStore::open(&dir).unwrap());
    let engine = Harness::new(flagged_device())
        .store(Arc::clone(&store))
        .open()
        .await;
    engine.start_verification(device_settings()).await.unwrap();
    engine.start_verification(device_settings()).await.unwrap();

    engine.clear_verification_data().await;
    engine.clear_verification_data().await;

    assert!(engine.verification_history().await.is_empty());
    assert!(engine.verification_proof().await.is_none());
    assert_eq!(engine.verification_stats().await.total, 0);
    let key = ResultStore::record_key(engine.device_id());
    assert!(store.get(&key).await.unwrap().is_none());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_unavailable_storage_is_not_fatal() {
    let engine = Harness::new(flagged_device())
        .store(Arc::new(FailingStore))
        .open()
        .await;
    let mut errors = engine.subscribe_errors();

    let attempt = engine.start_verification(device_settings()).await.unwrap();
    assert!(attempt.verified);
    assert_eq!(engine.verification_history().await.len(), 1);

    engine.clear_verification_data().await;
    assert!(engine.verification_history().await.is_empty());

    let operations: Vec<&str> = std::iter::from_fn(|| errors.try_recv().ok())
        .map(|notice| notice.operation)
        .collect();
    assert_eq!(operations, vec!["persist", "clear"]);
}
