//! Multi-factor confidence fusion.
//!
//! Overall confidence is the weighted mean over the factors that succeeded:
//!
//! ```text
//! confidence = Σ(confidence_i · weight_i) / Σ(weight_i of succeeded factors)
//! ```
//!
//! Failed factors contribute neither to the numerator nor the denominator,
//! so losing a factor lowers the achievable level through the factor count
//! rather than by dragging the confidence down.

use agegate_core::{FactorType, FactorWeights, VerificationFactor, VerificationLevel};

use crate::error::EngineError;

/// Result of one multi-factor constituent.
#[derive(Debug, Clone, PartialEq)]
pub enum FactorOutcome {
    Succeeded { factor: FactorType, confidence: f64 },
    Failed { factor: FactorType, reason: String },
}

impl FactorOutcome {
    pub fn factor(&self) -> FactorType {
        match self {
            Self::Succeeded { factor, .. } | Self::Failed { factor, .. } => *factor,
        }
    }
}

/// Fused decision over all constituents.
#[derive(Debug, Clone, PartialEq)]
pub struct Fusion {
    pub confidence: f64,
    pub level: VerificationLevel,
    pub verified: bool,
    pub factors: Vec<VerificationFactor>,
    pub failed: Vec<(FactorType, String)>,
}

/// Fuse constituent outcomes. Fails only when every constituent failed.
pub fn fuse(outcomes: &[FactorOutcome], weights: &FactorWeights) -> Result<Fusion, EngineError> {
    let mut factors = Vec::new();
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome {
            FactorOutcome::Succeeded { factor, confidence } => factors.push(VerificationFactor {
                factor_type: *factor,
                confidence: confidence.clamp(0.0, 1.0),
                weight: weights.weight(*factor),
            }),
            FactorOutcome::Failed { factor, reason } => failed.push((*factor, reason.clone())),
        }
    }

    let total_weight: f64 = factors.iter().map(|f| f.weight).sum();
    if factors.is_empty() || total_weight <= 0.0 {
        return Err(EngineError::AllFactorsFailed(failed));
    }

    let weighted: f64 = factors.iter().map(|f| f.confidence * f.weight).sum();
    let confidence = (weighted / total_weight).clamp(0.0, 1.0);
    let level = VerificationLevel::determine(confidence, factors.len());
    let verified = level.accepts(confidence);

    Ok(Fusion {
        confidence,
        level,
        verified,
        factors,
        failed,
    })
}
