/// Core errors: invalid input and configuration.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unknown verification method: {0}")]
    UnknownMethod(String),

    #[error("unknown document type: {0}")]
    UnknownDocumentType(String),

    #[error("unknown factor type: {0}")]
    UnknownFactorType(String),

    #[error("invalid device id: {0}")]
    InvalidDeviceId(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
