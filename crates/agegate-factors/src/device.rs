use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FactorError;

/// Flag value that marks the device owner as age-verified.
pub const VERIFIED_FLAG_VALUE: &str = "verified";

/// Lower bound of behavioral confidence.
pub const BEHAVIORAL_FLOOR: f64 = 0.7;
/// Behavioral confidence stays strictly below this.
pub const BEHAVIORAL_CEILING: f64 = 0.95;

/// Usage patterns observed and kept on this device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageSignals {
    pub account_age_days: u32,
    pub sessions_last_30_days: u32,
    pub avg_session_minutes: f64,
    /// Share of sessions between midnight and 5am, 0.0 - 1.0.
    pub late_night_ratio: f64,
    pub purchase_count: u32,
}

/// Local device state: settings flags and usage history.
#[async_trait]
pub trait DeviceContext: Send + Sync {
    async fn setting(&self, key: &str) -> Result<Option<String>, FactorError>;

    async fn usage_signals(&self) -> Result<Option<UsageSignals>, FactorError>;
}

/// Reads one device flag and reports a fixed confidence when it is set.
#[derive(Debug, Clone)]
pub struct DeviceSettingCheck {
    key: String,
    confidence: f64,
}

impl DeviceSettingCheck {
    pub fn new(key: impl Into<String>, confidence: f64) -> Self {
        Self {
            key: key.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn check(&self, device: &dyn DeviceContext) -> Result<f64, FactorError> {
        match device.setting(&self.key).await? {
            Some(value) if value == VERIFIED_FLAG_VALUE => {
                tracing::debug!(key = %self.key, "device age flag verified");
                Ok(self.confidence)
            }
            Some(value) => Err(FactorError::DeviceNotVerified(format!(
                "{} is {:?}",
                self.key, value
            ))),
            None => Err(FactorError::DeviceNotVerified(format!("{} is unset", self.key))),
        }
    }
}

/// Heuristic score over local usage signals, mapped into [0.7, 0.95).
pub fn behavioral_confidence(signals: &UsageSignals) -> f64 {
    let tenure = (signals.account_age_days as f64 / 365.0).min(1.0);
    let regularity = (signals.sessions_last_30_days as f64 / 30.0).min(1.0);
    let session_shape = if (5.0..=60.0).contains(&signals.avg_session_minutes) {
        1.0
    } else {
        0.5
    };
    let daytime = 1.0 - signals.late_night_ratio.clamp(0.0, 1.0);
    let purchases = (signals.purchase_count as f64 / 5.0).min(1.0);

    let heuristic =
        0.30 * tenure + 0.20 * regularity + 0.15 * session_shape + 0.20 * daytime + 0.15 * purchases;
    let span = BEHAVIORAL_CEILING - BEHAVIORAL_FLOOR;
    (BEHAVIORAL_FLOOR + span * heuristic.clamp(0.0, 1.0)).min(BEHAVIORAL_CEILING - 1e-6)
}

/// Behavioral factor: confidence from locally observed usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct BehavioralEstimator;

impl BehavioralEstimator {
    pub async fn estimate(&self, device: &dyn DeviceContext) -> Result<f64, FactorError> {
        let signals = device
            .usage_signals()
            .await?
            .ok_or(FactorError::NoUsageSignals)?;
        let confidence = behavioral_confidence(&signals);
        tracing::debug!(confidence, "behavioral estimate");
        Ok(confidence)
    }
}
