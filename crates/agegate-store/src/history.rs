use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agegate_core::{DeviceId, VerificationAttempt};

use crate::error::StoreError;
use crate::PersistentStore;

/// Prefix of the durable record key; the device id follows after `:`.
pub const HISTORY_KEY_PREFIX: &str = "age_verification";

/// Durable form of the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredHistory {
    pub device_id: DeviceId,
    pub updated_at: DateTime<Utc>,
    pub attempts: Vec<VerificationAttempt>,
}

/// Bounded, append-only verification history with a durable mirror.
///
/// The in-memory list is authoritative. Every mutation updates it first and
/// then mirrors it; a mirror failure is returned to the caller but never
/// rolls the in-memory state back.
pub struct ResultStore {
    device_id: DeviceId,
    key: String,
    capacity: usize,
    attempts: VecDeque<VerificationAttempt>,
    backend: Arc<dyn PersistentStore>,
}

impl ResultStore {
    pub fn new(device_id: DeviceId, capacity: usize, backend: Arc<dyn PersistentStore>) -> Self {
        let capacity = capacity.max(1);
        Self {
            key: Self::record_key(&device_id),
            device_id,
            capacity,
            attempts: VecDeque::with_capacity(capacity + 1),
            backend,
        }
    }

    pub fn record_key(device_id: &DeviceId) -> String {
        format!("{}:{}", HISTORY_KEY_PREFIX, device_id)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Load the durable record into memory, replacing the in-memory list.
    /// Returns the number of attempts restored.
    pub async fn restore(&mut self) -> Result<usize, StoreError> {
        let Some(bytes) = self.backend.get(&self.key).await? else {
            return Ok(0);
        };
        let stored: StoredHistory = serde_json::from_slice(&bytes)?;
        if stored.device_id != self.device_id {
            return Err(StoreError::DeviceMismatch {
                expected: self.device_id.to_string(),
                found: stored.device_id.to_string(),
            });
        }

        self.attempts = stored.attempts.into_iter().collect();
        self.evict();
        tracing::info!(
            device_id = %self.device_id,
            restored = self.attempts.len(),
            "verification history restored"
        );
        Ok(self.attempts.len())
    }

    /// Append an attempt, evicting the oldest beyond capacity, then mirror.
    pub async fn append(&mut self, attempt: VerificationAttempt) -> Result<(), StoreError> {
        tracing::debug!(attempt_id = %attempt.id, method = %attempt.method, "recording attempt");
        self.attempts.push_back(attempt);
        self.evict();
        self.persist().await
    }

    /// Empty the in-memory list, then delete the durable record.
    pub async fn clear(&mut self) -> Result<(), StoreError> {
        self.attempts.clear();
        self.backend.delete(&self.key).await
    }

    pub fn latest(&self) -> Option<&VerificationAttempt> {
        self.attempts.back()
    }

    /// Oldest first.
    pub fn attempts(&self) -> impl Iterator<Item = &VerificationAttempt> {
        self.attempts.iter()
    }

    /// Up to `limit` attempts, newest first.
    pub fn recent(&self, limit: usize) -> Vec<VerificationAttempt> {
        self.attempts.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    fn evict(&mut self) {
        while self.attempts.len() > self.capacity {
            if let Some(evicted) = self.attempts.pop_front() {
                tracing::debug!(attempt_id = %evicted.id, "evicted oldest attempt");
            }
        }
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let stored = StoredHistory {
            device_id: self.device_id.clone(),
            updated_at: Utc::now(),
            attempts: self.attempts.iter().cloned().collect(),
        };
        let bytes = serde_json::to_vec(&stored)?;
        self.backend.put(&self.key, bytes).await
    }
}
