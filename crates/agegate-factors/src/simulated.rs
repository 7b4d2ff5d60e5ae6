//! Simulated backends standing in for a real camera, ML model and device.
//!
//! Values are random within the documented policy bounds: estimated age in
//! [18, 33), confidence in [0.6, 0.95), liveness in [0.7, 0.95).

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use agegate_core::DocumentType;

use crate::capability::{Capability, CapabilityError, CapabilityProvider};
use crate::capture::{CameraStream, FileHandle, RawSample, SampleCapture};
use crate::device::{DeviceContext, UsageSignals};
use crate::error::FactorError;
use crate::quality::ImageQuality;
use crate::scorer::{ExtractedDocument, FaceScore, SampleScorer};

const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 48;

const NAMES: [&str; 4] = ["Alex Morgan", "Sam Rivera", "Jamie Chen", "Taylor Okafor"];

/// Random scorer bounded by the estimation policy.
pub struct SimulatedScorer {
    rng: Mutex<StdRng>,
}

impl SimulatedScorer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible output for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> Result<T, FactorError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| FactorError::Scoring("scorer rng poisoned".into()))?;
        Ok(f(&mut rng))
    }
}

impl Default for SimulatedScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleScorer for SimulatedScorer {
    fn score_face(
        &self,
        _frame: &RawSample,
        quality: &ImageQuality,
    ) -> Result<FaceScore, FactorError> {
        self.with_rng(|rng| {
            let base: f64 = rng.gen_range(0.6..0.95);
            FaceScore {
                estimated_age: rng.gen_range(18..33),
                confidence: (base + quality.confidence_adjustment()).clamp(0.6, 0.9499),
                liveness: rng.gen_range(0.7..0.95),
            }
        })
    }

    fn extract_document(
        &self,
        _image: &RawSample,
        document_type: DocumentType,
    ) -> Result<ExtractedDocument, FactorError> {
        let today = Utc::now().date_naive();
        self.with_rng(|rng| {
            let age_days = rng.gen_range(18 * 365 + 10..65 * 365);
            let id: u32 = rng.gen_range(1_000_000..10_000_000);
            let specific = match document_type {
                DocumentType::DriversLicense => ["A", "B", "C"][rng.gen_range(0..3)],
                DocumentType::Passport => ["CA", "DE", "JP", "BR"][rng.gen_range(0..4)],
                DocumentType::NationalId => ["North", "Central", "South"][rng.gen_range(0..3)],
                DocumentType::StudentId => ["State University", "City College"][rng.gen_range(0..2)],
            };
            ExtractedDocument {
                full_name: Some(NAMES[rng.gen_range(0..NAMES.len())].to_string()),
                date_of_birth: Some(today - Duration::days(age_days)),
                id_number: Some(format!("{}{}", document_type.as_str()[..1].to_uppercase(), id)),
                expiry_date: Some(today + Duration::days(rng.gen_range(30..8 * 365))),
                specific_field: Some(specific.to_string()),
            }
        })
    }
}

/// Camera producing synthetic noise frames; files are read from disk and
/// treated as luma rows.
#[derive(Debug, Clone, Default)]
pub struct SimulatedCapture {
    deny_camera: bool,
}

impl SimulatedCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capture whose camera permission is always denied.
    pub fn without_camera() -> Self {
        Self { deny_camera: true }
    }
}

struct SimulatedCamera {
    rng: StdRng,
    stopped: bool,
}

#[async_trait]
impl CameraStream for SimulatedCamera {
    async fn capture_frame(&mut self) -> Result<RawSample, FactorError> {
        if self.stopped {
            return Err(FactorError::CaptureFailed("stream stopped".into()));
        }
        let luma: Vec<u8> = (0..FRAME_WIDTH * FRAME_HEIGHT)
            .map(|_| self.rng.gen_range(60..200))
            .collect();
        RawSample::luma(FRAME_WIDTH, FRAME_HEIGHT, &luma)
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

#[async_trait]
impl SampleCapture for SimulatedCapture {
    async fn open_camera(&self) -> Result<Box<dyn CameraStream>, FactorError> {
        if self.deny_camera {
            return Err(FactorError::CameraUnavailable("camera permission denied".into()));
        }
        Ok(Box::new(SimulatedCamera {
            rng: StdRng::from_entropy(),
            stopped: false,
        }))
    }

    async fn read_file(&self, handle: &FileHandle) -> Result<RawSample, FactorError> {
        let bytes = tokio::fs::read(handle.as_str())
            .await
            .map_err(|e| FactorError::CaptureFailed(format!("{}: {}", handle.as_str(), e)))?;
        let width = u32::try_from(bytes.len())
            .map_err(|_| FactorError::InvalidSample("file too large".into()))?;
        RawSample::luma(width, 1, &bytes)
    }
}

/// In-memory device: a fixed capability set, settings flags and usage
/// signals.
pub struct SimulatedDevice {
    capabilities: HashSet<Capability>,
    settings: RwLock<HashMap<String, String>>,
    signals: RwLock<Option<UsageSignals>>,
}

impl SimulatedDevice {
    /// A device with every capability and no flags or usage history.
    pub fn new() -> Self {
        Self {
            capabilities: [
                Capability::Camera,
                Capability::SecureDigest,
                Capability::PersistentStore,
                Capability::BackgroundWorker,
                Capability::DrawingSurface,
                Capability::FileReader,
            ]
            .into_iter()
            .collect(),
            settings: RwLock::new(HashMap::new()),
            signals: RwLock::new(None),
        }
    }

    pub fn without(mut self, capability: Capability) -> Self {
        self.capabilities.remove(&capability);
        self
    }

    pub fn with_setting(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Ok(mut settings) = self.settings.write() {
            settings.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_usage(self, signals: UsageSignals) -> Self {
        if let Ok(mut slot) = self.signals.write() {
            *slot = Some(signals);
        }
        self
    }

    /// Typical long-standing adult account.
    pub fn established_usage() -> UsageSignals {
        UsageSignals {
            account_age_days: 900,
            sessions_last_30_days: 24,
            avg_session_minutes: 18.0,
            late_night_ratio: 0.1,
            purchase_count: 6,
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProvider for SimulatedDevice {
    fn probe(&self, capability: Capability) -> Result<bool, CapabilityError> {
        Ok(self.capabilities.contains(&capability))
    }
}

#[async_trait]
impl DeviceContext for SimulatedDevice {
    async fn setting(&self, key: &str) -> Result<Option<String>, FactorError> {
        let settings = self
            .settings
            .read()
            .map_err(|_| FactorError::DeviceNotVerified("settings lock poisoned".into()))?;
        Ok(settings.get(key).cloned())
    }

    async fn usage_signals(&self) -> Result<Option<UsageSignals>, FactorError> {
        let signals = self
            .signals
            .read()
            .map_err(|_| FactorError::NoUsageSignals)?;
        Ok(*signals)
    }
}
