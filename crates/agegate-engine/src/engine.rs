use std::sync::Arc;
use std::time::Duration;

use futures::future::join3;
use tokio::sync::{broadcast, watch, Mutex};

use agegate_core::{
    AttemptDetails, DeviceId, EngineConfig, FactorType, VerificationAttempt, VerificationLevel,
    VerificationMethod,
};
use agegate_crypto::{Blake3Digest, ProofGenerator, SecureDigest};
use agegate_factors::{
    BehavioralEstimator, BiometricOptions, BiometricProcessor, CameraAccess, CameraArbiter,
    CancelSignal, Capability, CapabilityProber, CapabilityProvider, DeviceContext,
    DeviceSettingCheck, DocumentOptions, DocumentProcessor, FactorError, SampleCapture,
    SampleScorer, SimulatedCapture, SimulatedDevice, SimulatedScorer, ENGINE_REQUIREMENTS,
};
use agegate_store::{PersistentStore, ResultStore};

use crate::error::EngineError;
use crate::events::{EngineNotice, EngineStatus, EventBus, VerificationFailure};
use crate::fusion::{self, FactorOutcome};

/// Everything the engine consumes from its host.
pub struct Backends {
    pub capabilities: Arc<dyn CapabilityProvider>,
    pub capture: Arc<dyn SampleCapture>,
    pub scorer: Arc<dyn SampleScorer>,
    pub device: Arc<dyn DeviceContext>,
    pub digest: Arc<dyn SecureDigest>,
    pub store: Arc<dyn PersistentStore>,
}

impl Backends {
    /// Simulated camera and scorer over `device`, BLAKE3 digests, and the
    /// given store.
    pub fn simulated(device: Arc<SimulatedDevice>, store: Arc<dyn PersistentStore>) -> Self {
        Self {
            capabilities: device.clone(),
            capture: Arc::new(SimulatedCapture::new()),
            scorer: Arc::new(SimulatedScorer::new()),
            device,
            digest: Arc::new(Blake3Digest),
            store,
        }
    }
}

/// What to run and how.
#[derive(Debug, Clone, Default)]
pub struct VerificationOptions {
    pub method: VerificationMethod,
    pub biometric: BiometricOptions,
    pub document: DocumentOptions,
}

impl VerificationOptions {
    pub fn new(method: VerificationMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Options for a method given by name.
    pub fn parse(method: &str) -> Result<Self, EngineError> {
        Ok(Self::new(method.parse()?))
    }

    pub fn with_document(mut self, document: DocumentOptions) -> Self {
        self.document = document;
        self
    }

    pub fn with_biometric(mut self, biometric: BiometricOptions) -> Self {
        self.biometric = biometric;
        self
    }
}

/// The verification aggregator.
///
/// Drives the factor processors for the requested method, fuses
/// multi-factor results, attaches a proof and records every completed
/// attempt in the bounded history. One run is in flight at a time.
pub struct VerificationEngine {
    config: EngineConfig,
    pub(crate) device_id: DeviceId,
    prober: CapabilityProber,
    biometric: BiometricProcessor,
    document: DocumentProcessor,
    device_check: DeviceSettingCheck,
    behavioral: BehavioralEstimator,
    device: Arc<dyn DeviceContext>,
    digest: Arc<dyn SecureDigest>,
    pub(crate) history: Mutex<ResultStore>,
    run_lock: Mutex<()>,
    cancel_tx: watch::Sender<bool>,
    status_tx: watch::Sender<EngineStatus>,
    pub(crate) events: EventBus,
}

impl VerificationEngine {
    /// Create an engine with an empty in-memory history.
    pub fn new(
        config: EngineConfig,
        device_id: DeviceId,
        backends: Backends,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let prober = CapabilityProber::new(backends.capabilities);
        let camera = CameraAccess::new(
            backends.capture,
            CameraArbiter::new(),
            config.camera_timeout_ms.map(Duration::from_millis),
        );
        let biometric =
            BiometricProcessor::new(prober.clone(), camera.clone(), Arc::clone(&backends.scorer));
        let document =
            DocumentProcessor::new(prober.clone(), camera, backends.scorer, config.minimum_age);
        let device_check = DeviceSettingCheck::new(
            config.device_flag_key.clone(),
            config.device_settings_confidence,
        );
        let history = ResultStore::new(device_id.clone(), config.history_capacity, backends.store);
        let (cancel_tx, _) = watch::channel(false);
        let (status_tx, _) = watch::channel(EngineStatus::Idle);

        tracing::info!(
            %device_id,
            minimum_age = config.minimum_age,
            history_capacity = config.history_capacity,
            "creating verification engine"
        );

        Ok(Self {
            config,
            device_id,
            prober,
            biometric,
            document,
            device_check,
            behavioral: BehavioralEstimator,
            device: backends.device,
            digest: backends.digest,
            history: Mutex::new(history),
            run_lock: Mutex::new(()),
            cancel_tx,
            status_tx,
            events: EventBus::default(),
        })
    }

    /// Create an engine and load its durable history. A history that cannot
    /// be read is logged and the engine starts empty.
    pub async fn open(
        config: EngineConfig,
        device_id: DeviceId,
        backends: Backends,
    ) -> Result<Self, EngineError> {
        let engine = Self::new(config, device_id, backends)?;
        if let Err(e) = engine.restore().await {
            tracing::warn!(error = %e, "could not restore verification history");
        }
        Ok(engine)
    }

    /// Replace the in-memory history with the durable record.
    pub async fn restore(&self) -> Result<usize, EngineError> {
        let mut history = self.history.lock().await;
        Ok(history.restore().await?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Whether every capability the engine depends on is present. Any probe
    /// error counts as absent.
    pub fn is_available(&self) -> bool {
        self.prober.has_all(&ENGINE_REQUIREMENTS)
    }

    /// Whether `method` can run on this device at all.
    pub fn is_method_available(&self, method: VerificationMethod) -> bool {
        self.is_available() && self.prober.can_run_method(method)
    }

    pub fn status(&self) -> EngineStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<EngineStatus> {
        self.events.subscribe_status()
    }

    pub fn subscribe_completed(&self) -> broadcast::Receiver<VerificationAttempt> {
        self.events.subscribe_completed()
    }

    pub fn subscribe_failed(&self) -> broadcast::Receiver<VerificationFailure> {
        self.events.subscribe_failed()
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<EngineNotice> {
        self.events.subscribe_errors()
    }

    /// Run one verification. Waits for any run already in flight.
    pub async fn start_verification(
        &self,
        options: VerificationOptions,
    ) -> Result<VerificationAttempt, EngineError> {
        let _run = self.run_lock.lock().await;
        self.run(options).await
    }

    /// Run one verification, or fail with `AlreadyInProgress` if another run
    /// is in flight.
    pub async fn try_start_verification(
        &self,
        options: VerificationOptions,
    ) -> Result<VerificationAttempt, EngineError> {
        let _run = self
            .run_lock
            .try_lock()
            .map_err(|_| EngineError::AlreadyInProgress)?;
        self.run(options).await
    }

    /// Cancel the run in flight, releasing the camera, and go idle.
    pub fn stop(&self) {
        tracing::info!("stop requested");
        self.cancel_tx.send_replace(true);
        self.set_status(EngineStatus::Idle);
    }

    async fn run(&self, options: VerificationOptions) -> Result<VerificationAttempt, EngineError> {
        let method = options.method;
        self.set_status(EngineStatus::Initializing);
        tracing::info!(%method, "starting verification");

        let missing = self.prober.missing(&ENGINE_REQUIREMENTS);
        if !missing.is_empty() {
            let error =
                EngineError::CapabilityUnavailable(missing.iter().map(ToString::to_string).collect());
            return Err(self.fail(method, error));
        }

        self.cancel_tx.send_replace(false);
        let cancel = CancelSignal::new(self.cancel_tx.subscribe());
        let mut stop = cancel.clone();
        self.set_status(EngineStatus::Verifying);

        let dispatch = async {
            match method {
                VerificationMethod::Biometric => {
                    self.verify_biometric(&options.biometric, cancel).await
                }
                VerificationMethod::Document => {
                    self.verify_document(&options.document, cancel).await
                }
                VerificationMethod::DeviceSettings => self.verify_device_settings().await,
                VerificationMethod::MultiFactor => {
                    self.verify_multi_factor(&options.biometric, cancel).await
                }
            }
        };
        let outcome = tokio::select! {
            outcome = dispatch => outcome,
            _ = stop.cancelled() => Err(EngineError::Cancelled),
        };

        match outcome {
            Ok(_) if self.stop_requested() => Err(self.fail(method, EngineError::Cancelled)),
            Ok(attempt) => Ok(self.complete(attempt).await),
            Err(e) => Err(self.fail(method, e)),
        }
    }

    fn stop_requested(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    async fn verify_biometric(
        &self,
        options: &BiometricOptions,
        mut cancel: CancelSignal,
    ) -> Result<VerificationAttempt, EngineError> {
        let estimate = self
            .biometric
            .start_estimation(options, &mut cancel)
            .await
            .map_err(|e| EngineError::factor(VerificationMethod::Biometric, e))?;

        let meets_age = estimate.estimated_age >= self.config.minimum_age;
        let level = VerificationLevel::determine(estimate.confidence, usize::from(meets_age));
        Ok(VerificationAttempt::new(
            AttemptDetails::Biometric {
                estimated_age: estimate.estimated_age,
                age_range: estimate.age_range,
                liveness_score: estimate.liveness_score,
                quality_score: estimate.quality_score,
            },
            estimate.confidence,
            level,
            meets_age && level.accepts(estimate.confidence),
        ))
    }

    async fn verify_document(
        &self,
        options: &DocumentOptions,
        mut cancel: CancelSignal,
    ) -> Result<VerificationAttempt, EngineError> {
        let result = self
            .document
            .start_verification(options, &mut cancel)
            .await
            .map_err(|e| EngineError::factor(VerificationMethod::Document, e))?;

        let level = VerificationLevel::determine(result.confidence, usize::from(result.is_valid));
        let verified = result.is_valid && level.accepts(result.confidence);
        Ok(VerificationAttempt::new(
            AttemptDetails::Document {
                document_type: result.document_type,
                age: result.age,
                is_valid: result.is_valid,
                validation_errors: result.validation_errors,
            },
            result.confidence,
            level,
            verified,
        ))
    }

    async fn verify_device_settings(&self) -> Result<VerificationAttempt, EngineError> {
        let confidence = self
            .device_confidence()
            .await
            .map_err(|e| EngineError::factor(VerificationMethod::DeviceSettings, e))?;

        let level = VerificationLevel::determine(confidence, 1);
        Ok(VerificationAttempt::new(
            AttemptDetails::DeviceSettings {
                device_age_verified: true,
            },
            confidence,
            level,
            level.accepts(confidence),
        ))
    }

    async fn verify_multi_factor(
        &self,
        options: &BiometricOptions,
        cancel: CancelSignal,
    ) -> Result<VerificationAttempt, EngineError> {
        let mut biometric_cancel = cancel.clone();
        let (biometric, device, behavioral) = join3(
            self.biometric_factor(options, &mut biometric_cancel),
            self.device_factor(),
            self.behavioral_factor(),
        )
        .await;

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let outcomes = [biometric, device, behavioral];
        for outcome in &outcomes {
            if let FactorOutcome::Failed { factor, reason } = outcome {
                tracing::warn!(%factor, %reason, "verification factor failed");
            }
        }

        let fusion = fusion::fuse(&outcomes, &self.config.factor_weights)?;
        tracing::debug!(
            confidence = fusion.confidence,
            succeeded = fusion.factors.len(),
            failed = fusion.failed.len(),
            "factors fused"
        );
        Ok(VerificationAttempt::new(
            AttemptDetails::MultiFactor {
                failed_factors: fusion.failed.iter().map(|(factor, _)| *factor).collect(),
                factors: fusion.factors,
            },
            fusion.confidence,
            fusion.level,
            fusion.verified,
        ))
    }

    async fn biometric_factor(
        &self,
        options: &BiometricOptions,
        cancel: &mut CancelSignal,
    ) -> FactorOutcome {
        let factor = FactorType::Biometric;
        match self.biometric.start_estimation(options, cancel).await {
            Ok(estimate) if estimate.estimated_age >= self.config.minimum_age => {
                FactorOutcome::Succeeded {
                    factor,
                    confidence: estimate.confidence,
                }
            }
            Ok(estimate) => FactorOutcome::Failed {
                factor,
                reason: format!(
                    "estimated age {} below {}",
                    estimate.estimated_age, self.config.minimum_age
                ),
            },
            Err(e) => FactorOutcome::Failed {
                factor,
                reason: e.to_string(),
            },
        }
    }

    async fn device_factor(&self) -> FactorOutcome {
        let factor = FactorType::DeviceSettings;
        match self.device_confidence().await {
            Ok(confidence) => FactorOutcome::Succeeded { factor, confidence },
            Err(e) => FactorOutcome::Failed {
                factor,
                reason: e.to_string(),
            },
        }
    }

    async fn behavioral_factor(&self) -> FactorOutcome {
        let factor = FactorType::Behavioral;
        if !self.prober.can_run_factor(factor) {
            return FactorOutcome::Failed {
                factor,
                reason: "usage history unavailable".into(),
            };
        }
        match self.behavioral.estimate(self.device.as_ref()).await {
            Ok(confidence) => FactorOutcome::Succeeded { factor, confidence },
            Err(e) => FactorOutcome::Failed {
                factor,
                reason: e.to_string(),
            },
        }
    }

    async fn device_confidence(&self) -> Result<f64, FactorError> {
        if !self.prober.can_run_factor(FactorType::DeviceSettings) {
            return Err(FactorError::Unavailable("device settings unreadable".into()));
        }
        self.device_check.check(self.device.as_ref()).await
    }

    /// Attach the proof, record, notify.
    async fn complete(&self, attempt: VerificationAttempt) -> VerificationAttempt {
        let attempt = match self.proof_generator().generate(&attempt) {
            Some(proof) => attempt.with_proof(proof),
            None => attempt,
        };

        {
            let mut history = self.history.lock().await;
            if let Err(e) = history.append(attempt.clone()).await {
                tracing::warn!(
                    attempt_id = %attempt.id,
                    error = %e,
                    "failed to persist verification result"
                );
                self.events.error("persist", e.to_string());
            }
        }

        tracing::info!(
            attempt_id = %attempt.id,
            method = %attempt.method,
            verified = attempt.verified,
            level = %attempt.level,
            confidence = attempt.confidence,
            "verification completed"
        );
        self.set_status(EngineStatus::Completed);
        self.events.completed(attempt.clone());
        attempt
    }

    fn fail(&self, method: VerificationMethod, error: EngineError) -> EngineError {
        if matches!(error, EngineError::Cancelled) {
            tracing::info!(%method, "verification cancelled");
            self.set_status(EngineStatus::Idle);
        } else {
            tracing::warn!(%method, error = %error, "verification failed");
            self.set_status(EngineStatus::Failed);
            self.events.failed(method, error.to_string());
        }
        error
    }

    fn proof_generator(&self) -> ProofGenerator {
        let digest = self
            .prober
            .has(Capability::SecureDigest)
            .then(|| Arc::clone(&self.digest));
        ProofGenerator::new(digest)
    }

    fn set_status(&self, status: EngineStatus) {
        self.status_tx.send_replace(status);
        self.events.status(status);
    }
}
