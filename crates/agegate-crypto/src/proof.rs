use std::sync::Arc;

use agegate_core::{AttemptDetails, ProofToken, VerificationAttempt};
use serde_json::json;

use crate::error::CryptoError;
use crate::hashing::SecureDigest;

/// Length of a proof token in hex characters.
pub const PROOF_TOKEN_LEN: usize = 16;

/// Canonical summary a proof token commits to: the method, the fields that
/// decided the outcome, and the confidence.
///
/// `serde_json` maps are key-sorted, so the serialization is stable.
pub fn proof_summary(attempt: &VerificationAttempt) -> serde_json::Value {
    let fields = match &attempt.details {
        AttemptDetails::Biometric { estimated_age, .. } => json!({
            "estimated_age": estimated_age,
        }),
        AttemptDetails::Document {
            document_type, age, ..
        } => json!({
            "document_type": document_type,
            "age": age,
        }),
        AttemptDetails::DeviceSettings {
            device_age_verified,
        } => json!({
            "device_age_verified": device_age_verified,
        }),
        AttemptDetails::MultiFactor { factors, .. } => json!({
            "factors": factors,
        }),
    };

    json!({
        "method": attempt.method,
        "fields": fields,
        "confidence": attempt.confidence,
        "timestamp": attempt.timestamp.timestamp_millis(),
    })
}

/// Derives proof tokens for verified attempts.
///
/// Without a digest (or when the digest fails) the token falls back to a
/// timestamp-derived placeholder; generation itself never fails.
#[derive(Clone, Default)]
pub struct ProofGenerator {
    digest: Option<Arc<dyn SecureDigest>>,
}

impl ProofGenerator {
    pub fn new(digest: Option<Arc<dyn SecureDigest>>) -> Self {
        Self { digest }
    }

    /// Whether tokens from this generator will be digest-backed.
    pub fn has_digest(&self) -> bool {
        self.digest.is_some()
    }

    /// Build the token for `attempt`, or `None` if it is not verified.
    pub fn generate(&self, attempt: &VerificationAttempt) -> Option<ProofToken> {
        if !attempt.verified {
            return None;
        }

        let Some(digest) = &self.digest else {
            tracing::debug!(attempt_id = %attempt.id, "no secure digest, using fallback proof");
            return Some(fallback_token(attempt));
        };

        match digest_token(digest.as_ref(), attempt) {
            Ok(token) => Some(ProofToken::Digested(token)),
            Err(e) => {
                tracing::warn!(
                    attempt_id = %attempt.id,
                    algorithm = digest.algorithm(),
                    error = %e,
                    "digest failed, using fallback proof"
                );
                Some(fallback_token(attempt))
            }
        }
    }

    /// Recompute a digested token and compare. Fallback tokens never verify.
    pub fn verify(&self, attempt: &VerificationAttempt, token: &ProofToken) -> bool {
        match (token, &self.digest) {
            (ProofToken::Digested(expected), Some(digest)) => {
                digest_token(digest.as_ref(), attempt)
                    .map(|actual| &actual == expected)
                    .unwrap_or(false)
            }
            _ => false,
        }
    }
}

fn digest_token(
    digest: &dyn SecureDigest,
    attempt: &VerificationAttempt,
) -> Result<String, CryptoError> {
    let canonical = serde_json::to_vec(&proof_summary(attempt))?;
    let bytes = digest.digest(&canonical)?;
    if bytes.len() * 2 < PROOF_TOKEN_LEN {
        return Err(CryptoError::InvalidInput(format!(
            "digest too short: {} bytes",
            bytes.len()
        )));
    }
    Ok(hex::encode(&bytes[..PROOF_TOKEN_LEN / 2]))
}

fn fallback_token(attempt: &VerificationAttempt) -> ProofToken {
    ProofToken::Fallback(format!("{:016x}", attempt.timestamp.timestamp_millis()))
}
