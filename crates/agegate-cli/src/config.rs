//! CLI configuration loading and management.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use agegate_core::EngineConfig;

/// Full configuration for the `agegate` binary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgeGateConfig {
    /// Verification engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Where verification history is kept.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identity and simulated state of this device.
    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
    Rocksdb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend kind.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Path to the data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stable device identifier. Generated by `agegate init`.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Local settings flags exposed to the device-settings check.
    #[serde(default = "default_settings")]
    pub settings: BTreeMap<String, String>,
    /// Whether the simulated device has an established usage history.
    #[serde(default = "default_true")]
    pub usage_history: bool,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_log_level() -> String {
    "warn".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_settings() -> BTreeMap<String, String> {
    BTreeMap::from([("age_verified".to_string(), "verified".to_string())])
}
fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            settings: default_settings(),
            usage_history: true,
        }
    }
}

impl AgeGateConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: AgeGateConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
