//! AgeGate Core — Fundamental types, trust levels, and configuration for
//! the AgeGate on-device age verification engine.

pub mod config;
pub mod error;
pub mod level;
pub mod types;

pub use config::{EngineConfig, FactorWeights};
pub use error::CoreError;
pub use level::VerificationLevel;
pub use types::{
    AgeRange, AttemptDetails, DeviceId, DocumentType, FactorType, MethodStats, ProofToken,
    VerificationAttempt, VerificationFactor, VerificationMethod, VerificationStats,
    VerificationStatus,
};
