use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum confidence for a `basic` result.
pub const BASIC_THRESHOLD: f64 = 0.60;
/// Minimum confidence for a `standard` result.
pub const STANDARD_THRESHOLD: f64 = 0.75;
/// Minimum confidence for a `high` result.
pub const HIGH_THRESHOLD: f64 = 0.85;

/// Discrete trust level derived from a confidence and the number of
/// independent factors that backed it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    #[default]
    None,
    Basic,
    Standard,
    High,
}

impl VerificationLevel {
    /// Classify a confidence backed by `succeeded_factors` independent signals.
    ///
    /// Each level needs both its confidence threshold and its factor count;
    /// a single strong factor can never reach `standard`.
    pub fn determine(confidence: f64, succeeded_factors: usize) -> Self {
        if confidence >= HIGH_THRESHOLD && succeeded_factors >= 3 {
            Self::High
        } else if confidence >= STANDARD_THRESHOLD && succeeded_factors >= 2 {
            Self::Standard
        } else if confidence >= BASIC_THRESHOLD && succeeded_factors >= 1 {
            Self::Basic
        } else {
            Self::None
        }
    }

    /// Confidence a result at this level must carry to count as verified.
    /// `None` has no threshold.
    pub fn min_confidence(&self) -> Option<f64> {
        match self {
            Self::None => None,
            Self::Basic => Some(BASIC_THRESHOLD),
            Self::Standard => Some(STANDARD_THRESHOLD),
            Self::High => Some(HIGH_THRESHOLD),
        }
    }

    /// Whether `confidence` clears this level's threshold.
    pub fn accepts(&self, confidence: f64) -> bool {
        self.min_confidence()
            .map(|min| confidence >= min)
            .unwrap_or(false)
    }
}

impl fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Basic => write!(f, "basic"),
            Self::Standard => write!(f, "standard"),
            Self::High => write!(f, "high"),
        }
    }
}
