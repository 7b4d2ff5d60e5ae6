/// Digest and proof errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("digest unavailable: {0}")]
    DigestUnavailable(String),

    #[error("digest failed: {0}")]
    DigestFailed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
