//! AgeGate Factors — the independent signals an age verification is built
//! from.
//!
//! - Capability probing (fail-closed)
//! - Scoped camera capture and raw-sample lifecycle
//! - Biometric (facial-age) and document processors
//! - Device-setting and behavioral checks
//! - Simulated backends for the model, camera and device

pub mod biometric;
pub mod capability;
pub mod capture;
pub mod device;
pub mod document;
pub mod error;
pub mod quality;
pub mod scorer;
pub mod simulated;

pub use biometric::{BiometricEstimate, BiometricOptions, BiometricProcessor};
pub use capability::{
    Capability, CapabilityError, CapabilityProber, CapabilityProvider, ENGINE_REQUIREMENTS,
};
pub use capture::{
    CameraAccess, CameraArbiter, CameraGuard, CameraStream, CancelSignal, FileHandle, RawSample,
    SampleCapture,
};
pub use device::{BehavioralEstimator, DeviceContext, DeviceSettingCheck, UsageSignals};
pub use document::{CaptureSource, DocumentOptions, DocumentProcessor, DocumentVerification};
pub use error::FactorError;
pub use quality::ImageQuality;
pub use scorer::{ExtractedDocument, FaceScore, SampleScorer};
pub use simulated::{SimulatedCapture, SimulatedDevice, SimulatedScorer};
