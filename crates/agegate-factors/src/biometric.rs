use std::sync::Arc;

use serde::{Deserialize, Serialize};

use agegate_core::AgeRange;

use crate::capability::CapabilityProber;
use crate::capture::{CameraAccess, CancelSignal, RawSample};
use crate::error::FactorError;
use crate::quality::ImageQuality;
use crate::scorer::{FaceScore, SampleScorer};

/// Lowest age an estimate range may report.
pub const AGE_RANGE_FLOOR: u32 = 18;

/// Options for one facial-age estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiometricOptions {
    /// Frames with a lower liveness score are rejected.
    pub min_liveness: f64,
}

impl Default for BiometricOptions {
    fn default() -> Self {
        Self { min_liveness: 0.7 }
    }
}

/// Result of one facial-age estimation. The frame it came from is gone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiometricEstimate {
    pub estimated_age: u32,
    pub age_range: AgeRange,
    pub confidence: f64,
    pub liveness_score: f64,
    pub quality_score: f64,
}

/// Estimate ± round((1 - confidence) * 5), lower bound floored at 18.
pub fn age_range(estimated_age: u32, confidence: f64) -> AgeRange {
    let spread = ((1.0 - confidence.clamp(0.0, 1.0)) * 5.0).round() as u32;
    let min = estimated_age
        .saturating_sub(spread)
        .max(AGE_RANGE_FLOOR)
        .min(estimated_age);
    AgeRange {
        min,
        max: estimated_age + spread,
    }
}

/// Facial-age estimation from a single camera frame.
pub struct BiometricProcessor {
    prober: CapabilityProber,
    camera: CameraAccess,
    scorer: Arc<dyn SampleScorer>,
}

impl BiometricProcessor {
    pub fn new(
        prober: CapabilityProber,
        camera: CameraAccess,
        scorer: Arc<dyn SampleScorer>,
    ) -> Self {
        Self {
            prober,
            camera,
            scorer,
        }
    }

    pub fn is_available(&self) -> bool {
        self.prober.can_run_biometric()
    }

    /// Capture one frame, score it on a blocking worker, discard it.
    pub async fn start_estimation(
        &self,
        options: &BiometricOptions,
        cancel: &mut CancelSignal,
    ) -> Result<BiometricEstimate, FactorError> {
        if !self.is_available() {
            return Err(FactorError::Unavailable(
                "biometric estimation needs camera, drawing surface, worker and digest".into(),
            ));
        }

        let mut frame = self.camera.grab_frame(cancel).await.map_err(|e| match e {
            FactorError::CaptureFailed(reason) => FactorError::CameraUnavailable(reason),
            other => other,
        })?;
        tracing::debug!(width = frame.width(), height = frame.height(), "frame captured");

        let scorer = Arc::clone(&self.scorer);
        let (quality, score) =
            tokio::task::spawn_blocking(move || score_and_discard(scorer.as_ref(), &mut frame))
                .await
                .map_err(|e| FactorError::Worker(e.to_string()))?;
        let score = score?;
        if !score.confidence.is_finite() || !score.liveness.is_finite() {
            return Err(FactorError::Scoring("scorer returned a non-finite score".into()));
        }

        let confidence = score.confidence.clamp(0.0, 1.0);
        let liveness_score = score.liveness.clamp(0.0, 1.0);
        if liveness_score < options.min_liveness {
            return Err(FactorError::LivenessFailed {
                score: liveness_score,
                required: options.min_liveness,
            });
        }

        let estimate = BiometricEstimate {
            estimated_age: score.estimated_age,
            age_range: age_range(score.estimated_age, confidence),
            confidence,
            liveness_score,
            quality_score: quality.score(),
        };
        tracing::info!(
            estimated_age = estimate.estimated_age,
            confidence = estimate.confidence,
            liveness = estimate.liveness_score,
            "biometric estimation complete"
        );
        Ok(estimate)
    }
}

/// Measure and score `frame`, then zero it whatever the outcome.
fn score_and_discard(
    scorer: &dyn SampleScorer,
    frame: &mut RawSample,
) -> (ImageQuality, Result<FaceScore, FactorError>) {
    let quality = ImageQuality::measure(frame);
    let score = scorer.score_face(frame, &quality);
    frame.discard();
    (quality, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, CapabilityError, CapabilityProvider};
    use crate::capture::{CameraArbiter, CameraStream, FileHandle, RawSample, SampleCapture};
    use crate::scorer::{ExtractedDocument, FaceScore};
    use agegate_core::DocumentType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AllCapabilities;

    impl CapabilityProvider for AllCapabilities {
        fn probe(&self, _capability: Capability) -> Result<bool, CapabilityError> {
            Ok(true)
        }
    }

    struct NoCamera;

    impl CapabilityProvider for NoCamera {
        fn probe(&self, capability: Capability) -> Result<bool, CapabilityError> {
            Ok(capability != Capability::Camera)
        }
    }

    struct StubCamera {
        stops: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CameraStream for StubCamera {
        async fn capture_frame(&mut self) -> Result<RawSample, FactorError> {
            RawSample::luma(2, 2, &[60, 200, 200, 60])
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct StubCapture {
        stops: Arc<AtomicUsize>,
        deny: bool,
    }

    #[async_trait]
    impl SampleCapture for StubCapture {
        async fn open_camera(&self) -> Result<Box<dyn CameraStream>, FactorError> {
            if self.deny {
                return Err(FactorError::CameraUnavailable("permission denied".into()));
            }
            Ok(Box::new(StubCamera {
                stops: Arc::clone(&self.stops),
            }))
        }

        async fn read_file(&self, _handle: &FileHandle) -> Result<RawSample, FactorError> {
            Err(FactorError::CaptureFailed("unsupported".into()))
        }
    }

    struct FixedFace(FaceScore);

    impl SampleScorer for FixedFace {
        fn score_face(
            &self,
            frame: &RawSample,
            _quality: &ImageQuality,
        ) -> Result<FaceScore, FactorError> {
            assert!(!frame.is_discarded());
            Ok(self.0)
        }

        fn extract_document(
            &self,
            _image: &RawSample,
            _document_type: DocumentType,
        ) -> Result<ExtractedDocument, FactorError> {
            Err(FactorError::Scoring("not a document model".into()))
        }
    }

    struct NoFace;

    impl SampleScorer for NoFace {
        fn score_face(
            &self,
            _frame: &RawSample,
            _quality: &ImageQuality,
        ) -> Result<FaceScore, FactorError> {
            Err(FactorError::Scoring("no face found".into()))
        }

        fn extract_document(
            &self,
            _image: &RawSample,
            _document_type: DocumentType,
        ) -> Result<ExtractedDocument, FactorError> {
            Err(FactorError::Scoring("not a document model".into()))
        }
    }

    fn processor(
        caps: Arc<dyn CapabilityProvider>,
        deny: bool,
        score: FaceScore,
    ) -> (BiometricProcessor, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let capture = Arc::new(StubCapture {
            stops: Arc::clone(&stops),
            deny,
        });
        let camera = CameraAccess::new(capture, CameraArbiter::new(), None);
        (
            BiometricProcessor::new(
                CapabilityProber::new(caps),
                camera,
                Arc::new(FixedFace(score)),
            ),
            stops,
        )
    }

    fn adult() -> FaceScore {
        FaceScore {
            estimated_age: 25,
            confidence: 0.8,
            liveness: 0.9,
        }
    }

    #[test]
    fn test_age_range_spread() {
        assert_eq!(age_range(25, 0.8), AgeRange { min: 24, max: 26 });
        assert_eq!(age_range(25, 0.6), AgeRange { min: 23, max: 27 });
    }

    #[test]
    fn test_age_range_floored_at_18() {
        assert_eq!(age_range(19, 0.6), AgeRange { min: 18, max: 21 });
    }

    #[tokio::test]
    async fn test_estimation_releases_camera() {
        let (p, stops) = processor(Arc::new(AllCapabilities), false, adult());
        let estimate = p
            .start_estimation(&BiometricOptions::default(), &mut CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(estimate.estimated_age, 25);
        assert_eq!(estimate.age_range, AgeRange { min: 24, max: 26 });
        assert!(estimate.quality_score > 0.0);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_camera_denied() {
        let (p, stops) = processor(Arc::new(AllCapabilities), true, adult());
        let result = p
            .start_estimation(&BiometricOptions::default(), &mut CancelSignal::never())
            .await;
        assert!(matches!(result, Err(FactorError::CameraUnavailable(_))));
        assert_eq!(stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_without_camera() {
        let (p, _) = processor(Arc::new(NoCamera), false, adult());
        assert!(!p.is_available());
        let result = p
            .start_estimation(&BiometricOptions::default(), &mut CancelSignal::never())
            .await;
        assert!(matches!(result, Err(FactorError::Unavailable(_))));
    }

    #[test]
    fn test_frame_zeroed_after_scoring() {
        let mut frame = RawSample::luma(2, 2, &[60, 200, 200, 60]).unwrap();
        let (quality, score) = score_and_discard(&FixedFace(adult()), &mut frame);
        assert!(score.is_ok());
        assert!(quality.score() > 0.0);
        assert!(frame.is_discarded());
        assert_eq!(frame.width(), 0);
    }

    #[test]
    fn test_frame_zeroed_when_scoring_fails() {
        let mut frame = RawSample::luma(2, 2, &[60, 200, 200, 60]).unwrap();
        let (_, score) = score_and_discard(&NoFace, &mut frame);
        assert!(matches!(score, Err(FactorError::Scoring(_))));
        assert!(frame.is_discarded());
    }

    #[tokio::test]
    async fn test_non_finite_score_rejected() {
        let score = FaceScore {
            confidence: f64::NAN,
            ..adult()
        };
        let (p, stops) = processor(Arc::new(AllCapabilities), false, score);
        let result = p
            .start_estimation(&BiometricOptions::default(), &mut CancelSignal::never())
            .await;
        assert!(matches!(result, Err(FactorError::Scoring(_))));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_low_liveness_rejected() {
        let score = FaceScore {
            liveness: 0.4,
            ..adult()
        };
        let (p, stops) = processor(Arc::new(AllCapabilities), false, score);
        let result = p
            .start_estimation(&BiometricOptions::default(), &mut CancelSignal::never())
            .await;
        assert!(matches!(result, Err(FactorError::LivenessFailed { .. })));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
