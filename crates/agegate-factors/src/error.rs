/// Errors raised by a single verification factor.
#[derive(Debug, thiserror::Error)]
pub enum FactorError {
    #[error("required capability unavailable: {0}")]
    Unavailable(String),

    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("camera is already in use by another capture")]
    CameraBusy,

    #[error("timed out waiting for a camera frame")]
    CameraTimeout,

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("invalid capture source: {0}")]
    InvalidCaptureSource(String),

    #[error("invalid sample: {0}")]
    InvalidSample(String),

    #[error("scoring failed: {0}")]
    Scoring(String),

    #[error("liveness score {score:.2} below required {required:.2}")]
    LivenessFailed { score: f64, required: f64 },

    #[error("device setting not verified: {0}")]
    DeviceNotVerified(String),

    #[error("no local usage signals available")]
    NoUsageSignals,

    #[error("background worker failed: {0}")]
    Worker(String),

    #[error("cancelled")]
    Cancelled,
}
