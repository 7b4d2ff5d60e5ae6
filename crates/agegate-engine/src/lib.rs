//! AgeGate Engine — the verification aggregator.
//!
//! Runs the requested method (biometric, document, device settings or
//! multi-factor), fuses multi-factor confidences, attaches an anonymous
//! proof, records the attempt and publishes lifecycle events.

pub mod engine;
pub mod error;
pub mod events;
pub mod fusion;
pub mod status;

pub use engine::{Backends, VerificationEngine, VerificationOptions};
pub use error::EngineError;
pub use events::{EngineNotice, EngineStatus, EventBus, VerificationFailure};
pub use fusion::{fuse, FactorOutcome, Fusion};
pub use status::AnonymousProof;
