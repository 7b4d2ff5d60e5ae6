//! Read side of the engine: current status, anonymous proof, statistics
//! and history, plus the explicit wipe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agegate_core::{
    DeviceId, ProofToken, VerificationAttempt, VerificationLevel, VerificationStats,
    VerificationStatus,
};

use crate::engine::VerificationEngine;

/// Shareable summary of the latest verified attempt. Carries no name, age
/// or document data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymousProof {
    pub verified: bool,
    pub level: VerificationLevel,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub proof: ProofToken,
    pub device_id: DeviceId,
}

impl VerificationEngine {
    /// Status derived from the most recent attempt.
    pub async fn verification_status(&self) -> VerificationStatus {
        let history = self.history.lock().await;
        VerificationStatus::from_latest(history.latest())
    }

    /// Anonymous proof of the most recent attempt, or `None` if there is no
    /// attempt or it was not verified.
    pub async fn verification_proof(&self) -> Option<AnonymousProof> {
        let history = self.history.lock().await;
        let latest = history.latest()?;
        if !latest.verified {
            return None;
        }
        Some(AnonymousProof {
            verified: latest.verified,
            level: latest.level,
            confidence: latest.confidence,
            timestamp: latest.timestamp,
            proof: latest.proof.clone()?,
            device_id: self.device_id.clone(),
        })
    }

    pub async fn verification_stats(&self) -> VerificationStats {
        let history = self.history.lock().await;
        VerificationStats::from_history(history.attempts())
    }

    /// Retained attempts, oldest first.
    pub async fn verification_history(&self) -> Vec<VerificationAttempt> {
        let history = self.history.lock().await;
        history.attempts().cloned().collect()
    }

    /// Up to `limit` attempts, most recent first.
    pub async fn recent_history(&self, limit: usize) -> Vec<VerificationAttempt> {
        self.history.lock().await.recent(limit)
    }

    /// Erase all verification data held in memory and on disk.
    ///
    /// Never fails: a durable delete error is logged and reported on the
    /// error channel, and the in-memory history is empty regardless.
    pub async fn clear_verification_data(&self) {
        let mut history = self.history.lock().await;
        match history.clear().await {
            Ok(()) => tracing::info!(device_id = %self.device_id, "verification data cleared"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to delete stored verification data");
                self.events.error("clear", e.to_string());
            }
        }
    }
}
