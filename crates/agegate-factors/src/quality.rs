use serde::{Deserialize, Serialize};

use crate::capture::RawSample;

/// Mean luma below this is treated as underexposed.
const DARK_LIMIT: f64 = 40.0;
/// Mean luma above this is treated as overexposed.
const BRIGHT_LIMIT: f64 = 215.0;
/// Luma standard deviation at which contrast scores 1.0.
const FULL_CONTRAST: f64 = 64.0;

/// Exposure and contrast statistics of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageQuality {
    /// Mean luma, 0-255.
    pub brightness: f64,
    /// Luma variance.
    pub variance: f64,
    /// Luma standard deviation.
    pub contrast: f64,
}

impl ImageQuality {
    /// Measure a frame using Rec. 601 luma.
    pub fn measure(sample: &RawSample) -> Self {
        let pixels = sample.pixels();
        let count = pixels.len() / 4;
        if count == 0 {
            return Self {
                brightness: 0.0,
                variance: 0.0,
                contrast: 0.0,
            };
        }

        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for px in pixels.chunks_exact(4) {
            let luma = 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64;
            sum += luma;
            sum_sq += luma * luma;
        }

        let n = count as f64;
        let brightness = sum / n;
        let variance = (sum_sq / n - brightness * brightness).max(0.0);
        Self {
            brightness,
            variance,
            contrast: variance.sqrt(),
        }
    }

    pub fn is_well_exposed(&self) -> bool {
        (DARK_LIMIT..=BRIGHT_LIMIT).contains(&self.brightness)
    }

    /// Combined exposure/contrast score in [0, 1].
    pub fn score(&self) -> f64 {
        let exposure = 1.0 - ((self.brightness - 127.5).abs() / 127.5);
        let contrast = (self.contrast / FULL_CONTRAST).min(1.0);
        (0.5 * exposure + 0.5 * contrast).clamp(0.0, 1.0)
    }

    /// Shift applied to a model confidence: ±0.05 around a neutral frame,
    /// with an extra 0.05 penalty for bad exposure.
    pub fn confidence_adjustment(&self) -> f64 {
        let shift = (self.score() - 0.5) * 0.1;
        if self.is_well_exposed() {
            shift
        } else {
            shift - 0.05
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_frame_has_no_contrast() {
        let sample = RawSample::luma(2, 2, &[128; 4]).unwrap();
        let q = ImageQuality::measure(&sample);
        assert!((q.brightness - 128.0).abs() < 0.01);
        assert!(q.variance < 1e-6);
        assert!(q.is_well_exposed());
    }

    #[test]
    fn test_checkerboard_contrast() {
        let sample = RawSample::luma(2, 2, &[0, 255, 255, 0]).unwrap();
        let q = ImageQuality::measure(&sample);
        assert!((q.brightness - 127.5).abs() < 0.01);
        assert!((q.contrast - 127.5).abs() < 0.01);
        assert!((q.score() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_dark_frame_penalized() {
        let sample = RawSample::luma(2, 2, &[5; 4]).unwrap();
        let q = ImageQuality::measure(&sample);
        assert!(!q.is_well_exposed());
        assert!(q.confidence_adjustment() < -0.05);
    }

    #[test]
    fn test_discarded_sample_measures_zero() {
        let mut sample = RawSample::luma(1, 1, &[90]).unwrap();
        sample.discard();
        let q = ImageQuality::measure(&sample);
        assert_eq!(q.brightness, 0.0);
    }
}
