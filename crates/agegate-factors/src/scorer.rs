use chrono::NaiveDate;
use zeroize::Zeroize;

use agegate_core::DocumentType;

use crate::capture::RawSample;
use crate::error::FactorError;
use crate::quality::ImageQuality;

/// Raw model output for one face frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceScore {
    pub estimated_age: u32,
    pub confidence: f64,
    pub liveness: f64,
}

/// Fields read from a document image. String fields are zeroized on drop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDocument {
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub id_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    /// The field only this document type carries, see
    /// [`DocumentType::specific_field`].
    pub specific_field: Option<String>,
}

impl Drop for ExtractedDocument {
    fn drop(&mut self) {
        self.full_name.zeroize();
        self.id_number.zeroize();
        self.specific_field.zeroize();
    }
}

/// The model behind the biometric and document processors.
///
/// Called from a blocking worker thread; implementations may be CPU-heavy.
pub trait SampleScorer: Send + Sync {
    fn score_face(&self, frame: &RawSample, quality: &ImageQuality)
        -> Result<FaceScore, FactorError>;

    fn extract_document(
        &self,
        image: &RawSample,
        document_type: DocumentType,
    ) -> Result<ExtractedDocument, FactorError>;
}
