//! Lifecycle notifications emitted by the verification engine.
//!
//! Each event type has its own broadcast channel so observers subscribe only
//! to what they need. Sends never block and never fail the engine: an event
//! with no subscribers is dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use agegate_core::{VerificationAttempt, VerificationMethod};

/// Default buffer per event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Coarse engine state, published on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    #[default]
    Idle,
    Initializing,
    Verifying,
    Completed,
    Failed,
}

/// A verification run that ended without an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationFailure {
    /// Method that was requested.
    pub method: VerificationMethod,
    /// Rendered error.
    pub reason: String,
}

/// A problem the engine absorbed without failing the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineNotice {
    /// Operation that hit the problem, e.g. `"persist"` or `"clear"`.
    pub operation: &'static str,
    pub message: String,
}

/// Fan-out hub for engine notifications.
#[derive(Debug, Clone)]
pub struct EventBus {
    status_tx: broadcast::Sender<EngineStatus>,
    completed_tx: broadcast::Sender<VerificationAttempt>,
    failed_tx: broadcast::Sender<VerificationFailure>,
    error_tx: broadcast::Sender<EngineNotice>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (status_tx, _) = broadcast::channel(capacity);
        let (completed_tx, _) = broadcast::channel(capacity);
        let (failed_tx, _) = broadcast::channel(capacity);
        let (error_tx, _) = broadcast::channel(capacity);
        Self {
            status_tx,
            completed_tx,
            failed_tx,
            error_tx,
        }
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<EngineStatus> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_completed(&self) -> broadcast::Receiver<VerificationAttempt> {
        self.completed_tx.subscribe()
    }

    pub fn subscribe_failed(&self) -> broadcast::Receiver<VerificationFailure> {
        self.failed_tx.subscribe()
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<EngineNotice> {
        self.error_tx.subscribe()
    }

    pub(crate) fn status(&self, status: EngineStatus) {
        let _ = self.status_tx.send(status);
    }

    pub(crate) fn completed(&self, attempt: VerificationAttempt) {
        let _ = self.completed_tx.send(attempt);
    }

    pub(crate) fn failed(&self, method: VerificationMethod, reason: String) {
        let _ = self.failed_tx.send(VerificationFailure { method, reason });
    }

    pub(crate) fn error(&self, operation: &'static str, message: String) {
        let _ = self.error_tx.send(EngineNotice { operation, message });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
