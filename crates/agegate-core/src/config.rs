use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::FactorType;

/// Fusion weights per multi-factor constituent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    #[serde(default = "default_biometric_weight")]
    pub biometric: f64,
    #[serde(default = "default_device_settings_weight")]
    pub device_settings: f64,
    #[serde(default = "default_behavioral_weight")]
    pub behavioral: f64,
}

impl FactorWeights {
    pub fn weight(&self, factor: FactorType) -> f64 {
        match factor {
            FactorType::Biometric => self.biometric,
            FactorType::DeviceSettings => self.device_settings,
            FactorType::Behavioral => self.behavioral,
        }
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            biometric: default_biometric_weight(),
            device_settings: default_device_settings_weight(),
            behavioral: default_behavioral_weight(),
        }
    }
}

/// Configuration for the verification engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Age threshold a user must meet.
    #[serde(default = "default_minimum_age")]
    pub minimum_age: u32,
    /// Number of attempts retained in history.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Confidence reported by the device-settings check when the flag is set.
    #[serde(default = "default_device_settings_confidence")]
    pub device_settings_confidence: f64,
    /// Local device flag read by the device-settings check.
    #[serde(default = "default_device_flag_key")]
    pub device_flag_key: String,
    /// Multi-factor fusion weights.
    #[serde(default)]
    pub factor_weights: FactorWeights,
    /// Upper bound on waiting for a camera frame, in milliseconds.
    #[serde(default)]
    pub camera_timeout_ms: Option<u64>,
}

fn default_biometric_weight() -> f64 {
    0.4
}
fn default_device_settings_weight() -> f64 {
    0.3
}
fn default_behavioral_weight() -> f64 {
    0.3
}
fn default_minimum_age() -> u32 {
    18
}
fn default_history_capacity() -> usize {
    10
}
fn default_device_settings_confidence() -> f64 {
    0.8
}
fn default_device_flag_key() -> String {
    "age_verified".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            minimum_age: default_minimum_age(),
            history_capacity: default_history_capacity(),
            device_settings_confidence: default_device_settings_confidence(),
            device_flag_key: default_device_flag_key(),
            factor_weights: FactorWeights::default(),
            camera_timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.history_capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "history_capacity must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.device_settings_confidence) {
            return Err(CoreError::InvalidConfig(format!(
                "device_settings_confidence {} outside [0, 1]",
                self.device_settings_confidence
            )));
        }
        for factor in FactorType::ALL {
            let weight = self.factor_weights.weight(factor);
            if !weight.is_finite() || weight <= 0.0 {
                return Err(CoreError::InvalidConfig(format!(
                    "weight for {} must be positive, got {}",
                    factor, weight
                )));
            }
        }
        if self.device_flag_key.is_empty() {
            return Err(CoreError::InvalidConfig("device_flag_key is empty".into()));
        }
        Ok(())
    }
}
