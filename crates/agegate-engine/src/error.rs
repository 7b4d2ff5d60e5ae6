use agegate_core::{CoreError, FactorType, VerificationMethod};
use agegate_factors::FactorError;
use agegate_store::StoreError;

/// Errors surfaced by the verification engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("required capabilities unavailable: {}", .0.join(", "))]
    CapabilityUnavailable(Vec<String>),

    #[error("a verification is already in progress")]
    AlreadyInProgress,

    #[error("unknown verification method: {0}")]
    UnknownMethod(String),

    #[error("{method} verification failed: {source}")]
    VerificationFailed {
        method: VerificationMethod,
        #[source]
        source: FactorError,
    },

    #[error("all {} verification factors failed", .0.len())]
    AllFactorsFailed(Vec<(FactorType, String)>),

    #[error("verification cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Wrap a single-method processor error.
    pub fn factor(method: VerificationMethod, error: FactorError) -> Self {
        match error {
            FactorError::Cancelled => Self::Cancelled,
            source => Self::VerificationFailed { method, source },
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UnknownMethod(name) => Self::UnknownMethod(name),
            other => Self::Config(other.to_string()),
        }
    }
}
