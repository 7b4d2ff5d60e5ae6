use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;
use crate::level::VerificationLevel;

/// Stable, device-scoped identity. Keys the persisted history and is the
/// only identifier an anonymous proof carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(CoreError::InvalidDeviceId(id));
        }
        Ok(Self(id))
    }

    /// Generate a fresh random identity (`device_<uuid>`).
    pub fn generate() -> Self {
        Self(format!("device_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a verification run establishes the user's age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Biometric,
    Document,
    DeviceSettings,
    #[default]
    MultiFactor,
}

impl VerificationMethod {
    pub const ALL: [VerificationMethod; 4] = [
        Self::Biometric,
        Self::Document,
        Self::DeviceSettings,
        Self::MultiFactor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Biometric => "biometric",
            Self::Document => "document",
            Self::DeviceSettings => "device_settings",
            Self::MultiFactor => "multi_factor",
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "biometric" => Ok(Self::Biometric),
            "document" => Ok(Self::Document),
            "device_settings" => Ok(Self::DeviceSettings),
            "multi_factor" => Ok(Self::MultiFactor),
            other => Err(CoreError::UnknownMethod(other.to_string())),
        }
    }
}

/// One constituent signal of a multi-factor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorType {
    Biometric,
    DeviceSettings,
    Behavioral,
}

impl FactorType {
    pub const ALL: [FactorType; 3] = [Self::Biometric, Self::DeviceSettings, Self::Behavioral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Biometric => "biometric",
            Self::DeviceSettings => "device_settings",
            Self::Behavioral => "behavioral",
        }
    }
}

impl fmt::Display for FactorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactorType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "biometric" => Ok(Self::Biometric),
            "device_settings" => Ok(Self::DeviceSettings),
            "behavioral" => Ok(Self::Behavioral),
            other => Err(CoreError::UnknownFactorType(other.to_string())),
        }
    }
}

/// Identity documents the document processor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    DriversLicense,
    Passport,
    NationalId,
    StudentId,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DriversLicense => "drivers_license",
            Self::Passport => "passport",
            Self::NationalId => "national_id",
            Self::StudentId => "student_id",
        }
    }

    /// Name of the field only this document type carries.
    pub fn specific_field(&self) -> &'static str {
        match self {
            Self::DriversLicense => "license_class",
            Self::Passport => "nationality",
            Self::NationalId => "issuing_region",
            Self::StudentId => "institution",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drivers_license" => Ok(Self::DriversLicense),
            "passport" => Ok(Self::Passport),
            "national_id" => Ok(Self::NationalId),
            "student_id" => Ok(Self::StudentId),
            other => Err(CoreError::UnknownDocumentType(other.to_string())),
        }
    }
}

/// A factor that succeeded in a multi-factor run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerificationFactor {
    #[serde(rename = "type")]
    pub factor_type: FactorType,
    /// Raw confidence reported by the factor (0.0 - 1.0).
    pub confidence: f64,
    /// Fusion weight of this factor type.
    pub weight: f64,
}

/// Inclusive estimated age bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

/// Method-specific payload of an attempt. Holds no names, id numbers or
/// raw samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptDetails {
    Biometric {
        estimated_age: u32,
        age_range: AgeRange,
        liveness_score: f64,
        quality_score: f64,
    },
    Document {
        document_type: DocumentType,
        age: Option<u32>,
        is_valid: bool,
        validation_errors: Vec<String>,
    },
    DeviceSettings {
        device_age_verified: bool,
    },
    MultiFactor {
        factors: Vec<VerificationFactor>,
        failed_factors: Vec<FactorType>,
    },
}

impl AttemptDetails {
    pub fn method(&self) -> VerificationMethod {
        match self {
            Self::Biometric { .. } => VerificationMethod::Biometric,
            Self::Document { .. } => VerificationMethod::Document,
            Self::DeviceSettings { .. } => VerificationMethod::DeviceSettings,
            Self::MultiFactor { .. } => VerificationMethod::MultiFactor,
        }
    }
}

/// Short non-reversible token summarizing a verified attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "token", rename_all = "snake_case")]
pub enum ProofToken {
    /// Truncated hex digest over the canonical attempt summary.
    Digested(String),
    /// Timestamp-derived placeholder used when no digest was available.
    Fallback(String),
}

impl ProofToken {
    pub fn token(&self) -> &str {
        match self {
            Self::Digested(t) | Self::Fallback(t) => t,
        }
    }

    /// Whether the token can be recomputed from the attempt summary.
    pub fn is_verifiable(&self) -> bool {
        matches!(self, Self::Digested(_))
    }
}

impl fmt::Display for ProofToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One completed run of one method. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub id: Uuid,
    pub method: VerificationMethod,
    pub verified: bool,
    pub confidence: f64,
    pub level: VerificationLevel,
    pub timestamp: DateTime<Utc>,
    pub details: AttemptDetails,
    pub proof: Option<ProofToken>,
}

impl VerificationAttempt {
    /// Build an attempt. `confidence` is clamped into [0, 1] (non-finite
    /// becomes 0) and `verified` is forced false when the level is `none`.
    pub fn new(
        details: AttemptDetails,
        confidence: f64,
        level: VerificationLevel,
        verified: bool,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            method: details.method(),
            verified: verified && level != VerificationLevel::None,
            confidence: if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
            level,
            timestamp: Utc::now(),
            details,
            proof: None,
        }
    }

    /// Attach a proof token. Ignored for unverified attempts.
    pub fn with_proof(mut self, proof: ProofToken) -> Self {
        if self.verified {
            self.proof = Some(proof);
        }
        self
    }

    /// Number of independent signals that backed this attempt.
    pub fn succeeded_factors(&self) -> usize {
        match &self.details {
            AttemptDetails::MultiFactor { factors, .. } => factors.len(),
            _ if self.level != VerificationLevel::None => 1,
            _ => 0,
        }
    }
}

/// View of the current verification state, derived from the latest attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationStatus {
    pub is_verified: bool,
    pub verification_level: VerificationLevel,
    pub last_verified: Option<DateTime<Utc>>,
    pub methods: Vec<VerificationMethod>,
    pub confidence: f64,
}

impl VerificationStatus {
    pub fn unverified() -> Self {
        Self {
            is_verified: false,
            verification_level: VerificationLevel::None,
            last_verified: None,
            methods: Vec::new(),
            confidence: 0.0,
        }
    }

    pub fn from_latest(latest: Option<&VerificationAttempt>) -> Self {
        match latest {
            None => Self::unverified(),
            Some(attempt) => Self {
                is_verified: attempt.verified,
                verification_level: attempt.level,
                last_verified: attempt.verified.then_some(attempt.timestamp),
                methods: vec![attempt.method],
                confidence: attempt.confidence,
            },
        }
    }
}

/// Per-method counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStats {
    pub total: usize,
    pub successful: usize,
}

/// Aggregate counters over the retained history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub method_stats: BTreeMap<VerificationMethod, MethodStats>,
}

impl VerificationStats {
    pub fn from_history<'a>(history: impl IntoIterator<Item = &'a VerificationAttempt>) -> Self {
        let mut stats = Self::default();
        for attempt in history {
            stats.total += 1;
            let entry = stats.method_stats.entry(attempt.method).or_default();
            entry.total += 1;
            if attempt.verified {
                stats.successful += 1;
                entry.successful += 1;
            } else {
                stats.failed += 1;
            }
        }
        stats
    }
}
