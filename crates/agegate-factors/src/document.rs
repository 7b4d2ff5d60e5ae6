use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use agegate_core::DocumentType;

use crate::capability::{Capability, CapabilityProber};
use crate::capture::{CameraAccess, CancelSignal, FileHandle};
use crate::error::FactorError;
use crate::scorer::{ExtractedDocument, SampleScorer};

/// Confidence of a clean extraction before penalties.
pub const BASE_CONFIDENCE: f64 = 0.8;
/// Confidence a document needs to be accepted.
pub const VALID_THRESHOLD: f64 = 0.6;

const MISSING_FIELD_PENALTY: f64 = 0.1;
const UNDERAGE_PENALTY: f64 = 0.3;
const EXPIRED_PENALTY: f64 = 0.2;
const INVALID_BIRTH_DATE_PENALTY: f64 = 0.3;

/// Where the document image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    Camera,
    File(FileHandle),
}

/// Options for one document verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    pub document_type: DocumentType,
    pub use_camera: bool,
    pub file: Option<FileHandle>,
}

impl DocumentOptions {
    pub fn camera(document_type: DocumentType) -> Self {
        Self {
            document_type,
            use_camera: true,
            file: None,
        }
    }

    pub fn file(document_type: DocumentType, file: FileHandle) -> Self {
        Self {
            document_type,
            use_camera: false,
            file: Some(file),
        }
    }

    /// The single capture source these options select.
    pub fn source(&self) -> Result<CaptureSource, FactorError> {
        match (self.use_camera, &self.file) {
            (true, None) => Ok(CaptureSource::Camera),
            (false, Some(file)) => Ok(CaptureSource::File(file.clone())),
            (true, Some(_)) => Err(FactorError::InvalidCaptureSource(
                "both camera and file supplied".into(),
            )),
            (false, None) => Err(FactorError::InvalidCaptureSource(
                "no camera or file supplied".into(),
            )),
        }
    }
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self::camera(DocumentType::default())
    }
}

/// Outcome of a document check. Carries no name or id number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVerification {
    pub document_type: DocumentType,
    pub age: Option<u32>,
    pub is_valid: bool,
    pub confidence: f64,
    pub validation_errors: Vec<String>,
}

/// Compute age in years from DOB and today's date.
pub fn compute_age(dob: NaiveDate, today: NaiveDate) -> i64 {
    let mut age = today.year() as i64 - dob.year() as i64;
    if today.month() < dob.month() || (today.month() == dob.month() && today.day() < dob.day()) {
        age -= 1;
    }
    age
}

/// Validate extracted fields against the schema of `document_type`.
pub fn validate_document(
    document: &ExtractedDocument,
    document_type: DocumentType,
    minimum_age: u32,
    today: NaiveDate,
) -> DocumentVerification {
    let mut errors = Vec::new();
    let mut confidence = BASE_CONFIDENCE;

    let required = [
        ("full_name", document.full_name.is_some()),
        ("date_of_birth", document.date_of_birth.is_some()),
        ("id_number", document.id_number.is_some()),
        ("expiry_date", document.expiry_date.is_some()),
        (document_type.specific_field(), document.specific_field.is_some()),
    ];
    for (field, present) in required {
        if !present {
            errors.push(format!("missing required field: {}", field));
            confidence -= MISSING_FIELD_PENALTY;
        }
    }

    let mut age = None;
    if let Some(dob) = document.date_of_birth {
        match u32::try_from(compute_age(dob, today)) {
            Ok(years) => {
                if years < minimum_age {
                    errors.push(format!("under {}", minimum_age));
                    confidence -= UNDERAGE_PENALTY;
                }
                age = Some(years);
            }
            Err(_) => {
                errors.push("birth date is in the future".into());
                confidence -= INVALID_BIRTH_DATE_PENALTY;
            }
        }
    }

    if let Some(expiry) = document.expiry_date {
        if expiry < today {
            errors.push("document expired".into());
            confidence -= EXPIRED_PENALTY;
        }
    }

    let confidence = confidence.max(0.0);
    DocumentVerification {
        document_type,
        age,
        is_valid: errors.is_empty() && confidence >= VALID_THRESHOLD,
        confidence,
        validation_errors: errors,
    }
}

/// Reads an identity document from the camera or an uploaded file.
pub struct DocumentProcessor {
    prober: CapabilityProber,
    camera: CameraAccess,
    scorer: Arc<dyn SampleScorer>,
    minimum_age: u32,
}

impl DocumentProcessor {
    pub fn new(
        prober: CapabilityProber,
        camera: CameraAccess,
        scorer: Arc<dyn SampleScorer>,
        minimum_age: u32,
    ) -> Self {
        Self {
            prober,
            camera,
            scorer,
            minimum_age,
        }
    }

    pub fn is_available(&self) -> bool {
        self.prober.can_run_document()
    }

    pub async fn start_verification(
        &self,
        options: &DocumentOptions,
        cancel: &mut CancelSignal,
    ) -> Result<DocumentVerification, FactorError> {
        let source = options.source()?;
        if !self.is_available() {
            return Err(FactorError::Unavailable(
                "document verification needs camera or file reader, drawing surface and worker"
                    .into(),
            ));
        }

        let mut image = match &source {
            CaptureSource::Camera => {
                if !self.prober.has(Capability::Camera) {
                    return Err(FactorError::CameraUnavailable("no camera on device".into()));
                }
                self.camera.grab_frame(cancel).await?
            }
            CaptureSource::File(handle) => {
                if !self.prober.has(Capability::FileReader) {
                    return Err(FactorError::Unavailable("no file reader on device".into()));
                }
                if cancel.is_cancelled() {
                    return Err(FactorError::Cancelled);
                }
                tokio::select! {
                    image = self.camera.capture().read_file(handle) => image?,
                    _ = cancel.cancelled() => return Err(FactorError::Cancelled),
                }
            }
        };

        let scorer = Arc::clone(&self.scorer);
        let document_type = options.document_type;
        let extracted = tokio::task::spawn_blocking(move || {
            let extracted = scorer.extract_document(&image, document_type);
            image.discard();
            extracted
        })
        .await
        .map_err(|e| FactorError::Worker(e.to_string()))??;

        let result = validate_document(
            &extracted,
            document_type,
            self.minimum_age,
            Utc::now().date_naive(),
        );
        drop(extracted);

        tracing::info!(
            document_type = %result.document_type,
            is_valid = result.is_valid,
            confidence = result.confidence,
            errors = result.validation_errors.len(),
            "document verification complete"
        );
        Ok(result)
    }
}
