use std::fmt;
use std::sync::Arc;

use agegate_core::{FactorType, VerificationMethod};

/// Platform features a verification path may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Camera,
    SecureDigest,
    PersistentStore,
    BackgroundWorker,
    DrawingSurface,
    FileReader,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Camera => "camera",
            Self::SecureDigest => "secure_digest",
            Self::PersistentStore => "persistent_store",
            Self::BackgroundWorker => "background_worker",
            Self::DrawingSurface => "drawing_surface",
            Self::FileReader => "file_reader",
        };
        f.write_str(name)
    }
}

/// Capabilities the engine as a whole needs before any run starts.
pub const ENGINE_REQUIREMENTS: [Capability; 4] = [
    Capability::Camera,
    Capability::SecureDigest,
    Capability::PersistentStore,
    Capability::BackgroundWorker,
];

/// A capability probe that could not be answered.
#[derive(Debug, thiserror::Error)]
#[error("probe for {capability} failed: {reason}")]
pub struct CapabilityError {
    pub capability: Capability,
    pub reason: String,
}

/// Answers which platform features exist on this device.
pub trait CapabilityProvider: Send + Sync {
    fn probe(&self, capability: Capability) -> Result<bool, CapabilityError>;

    fn has_camera(&self) -> Result<bool, CapabilityError> {
        self.probe(Capability::Camera)
    }

    fn has_secure_digest(&self) -> Result<bool, CapabilityError> {
        self.probe(Capability::SecureDigest)
    }

    fn has_persistent_store(&self) -> Result<bool, CapabilityError> {
        self.probe(Capability::PersistentStore)
    }

    fn has_background_worker(&self) -> Result<bool, CapabilityError> {
        self.probe(Capability::BackgroundWorker)
    }
}

/// Fail-closed view over a [`CapabilityProvider`]: a probe error counts as
/// the capability being absent.
#[derive(Clone)]
pub struct CapabilityProber {
    provider: Arc<dyn CapabilityProvider>,
}

impl CapabilityProber {
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self { provider }
    }

    pub fn has(&self, capability: Capability) -> bool {
        match self.provider.probe(capability) {
            Ok(present) => present,
            Err(e) => {
                tracing::warn!(%capability, error = %e, "capability probe failed");
                false
            }
        }
    }

    pub fn has_all(&self, capabilities: &[Capability]) -> bool {
        capabilities.iter().all(|c| self.has(*c))
    }

    /// Capabilities from `required` that are absent or failed to probe.
    pub fn missing(&self, required: &[Capability]) -> Vec<Capability> {
        required.iter().copied().filter(|c| !self.has(*c)).collect()
    }

    pub fn can_run_biometric(&self) -> bool {
        self.has_all(&[
            Capability::Camera,
            Capability::DrawingSurface,
            Capability::BackgroundWorker,
            Capability::SecureDigest,
        ])
    }

    pub fn can_run_document(&self) -> bool {
        (self.has(Capability::Camera) || self.has(Capability::FileReader))
            && self.has_all(&[Capability::DrawingSurface, Capability::BackgroundWorker])
    }

    pub fn can_run_factor(&self, factor: FactorType) -> bool {
        match factor {
            FactorType::Biometric => self.can_run_biometric(),
            FactorType::DeviceSettings | FactorType::Behavioral => {
                self.has(Capability::PersistentStore)
            }
        }
    }

    pub fn can_run_method(&self, method: VerificationMethod) -> bool {
        match method {
            VerificationMethod::Biometric => self.can_run_biometric(),
            VerificationMethod::Document => self.can_run_document(),
            VerificationMethod::DeviceSettings => self.can_run_factor(FactorType::DeviceSettings),
            VerificationMethod::MultiFactor => {
                FactorType::ALL.iter().any(|f| self.can_run_factor(*f))
            }
        }
    }
}
