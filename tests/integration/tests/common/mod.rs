//! Fixtures shared by the cross-crate tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use agegate_core::{DeviceId, DocumentType, EngineConfig};
use agegate_crypto::Blake3Digest;
use agegate_engine::{Backends, VerificationEngine};
use agegate_factors::{
    ExtractedDocument, FaceScore, FactorError, ImageQuality, RawSample, SampleCapture,
    SampleScorer, SimulatedCapture, SimulatedDevice,
};
use agegate_store::{MemoryStore, PersistentStore, StoreError};

/// Scorer with fixed outputs: one face, one document holder age.
#[derive(Debug, Clone, Copy)]
pub struct FixedScorer {
    pub face: FaceScore,
    pub holder_age_years: i64,
}

impl FixedScorer {
    pub fn adult(confidence: f64) -> Self {
        Self {
            face: FaceScore {
                estimated_age: 27,
                confidence,
                liveness: 0.9,
            },
            holder_age_years: 30,
        }
    }

    pub fn minor_document() -> Self {
        Self {
            holder_age_years: 16,
            ..Self::adult(0.8)
        }
    }
}

impl SampleScorer for FixedScorer {
    fn score_face(
        &self,
        _frame: &RawSample,
        _quality: &ImageQuality,
    ) -> Result<FaceScore, FactorError> {
        Ok(self.face)
    }

    fn extract_document(
        &self,
        _image: &RawSample,
        document_type: DocumentType,
    ) -> Result<ExtractedDocument, FactorError> {
        let today = Utc::now().date_naive();
        Ok(ExtractedDocument {
            full_name: Some("Jordan Example".into()),
            date_of_birth: Some(today - Duration::days(self.holder_age_years * 365 + 30)),
            id_number: Some("X0000001".into()),
            expiry_date: Some(today + Duration::days(400)),
            specific_field: Some(format!("{} field", document_type)),
        })
    }
}

/// Store that rejects every operation.
pub struct FailingStore;

#[async_trait]
impl PersistentStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }

    async fn put(&self, _key: &str, _value: Vec<u8>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }
}

pub fn device_id() -> DeviceId {
    DeviceId::new("device_integration").unwrap()
}

/// A device whose age flag is set.
pub fn flagged_device() -> SimulatedDevice {
    SimulatedDevice::new().with_setting("age_verified", "verified")
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("agegate-it-{}", rand::random::<u64>()))
}

/// Builder over [`Backends`] with deterministic defaults.
pub struct Harness {
    pub config: EngineConfig,
    pub device_id: DeviceId,
    pub device: SimulatedDevice,
    pub capture: Arc<dyn SampleCapture>,
    pub scorer: Arc<dyn SampleScorer>,
    pub store: Arc<dyn PersistentStore>,
}

impl Harness {
    pub fn new(device: SimulatedDevice) -> Self {
        Self {
            config: EngineConfig::default(),
            device_id: device_id(),
            device,
            capture: Arc::new(SimulatedCapture::new()),
            scorer: Arc::new(FixedScorer::adult(0.8)),
            store: Arc::new(MemoryStore::new()),
        }
    }

    pub fn without_camera(mut self) -> Self {
        self.capture = Arc::new(SimulatedCapture::without_camera());
        self
    }

    pub fn scorer(mut self, scorer: impl SampleScorer + 'static) -> Self {
        self.scorer = Arc::new(scorer);
        self
    }

    pub fn store(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.store = store;
        self
    }

    pub fn device_id(mut self, id: &str) -> Self {
        self.device_id = DeviceId::new(id).unwrap();
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn open(self) -> VerificationEngine {
        let device = Arc::new(self.device);
        let backends = Backends {
            capabilities: device.clone(),
            capture: self.capture,
            scorer: self.scorer,
            device,
            digest: Arc::new(Blake3Digest),
            store: self.store,
        };
        VerificationEngine::open(self.config, self.device_id, backends)
            .await
            .expect("engine should open")
    }
}
