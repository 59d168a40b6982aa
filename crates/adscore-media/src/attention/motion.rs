//! Per-frame motion intensity from dense optical flow.
//!
//! With the `opencv` feature the flow comes from
//! `video::calc_optical_flow_farneback`; otherwise from the pure-Rust
//! solver in [`super::flow`].

use image::RgbImage;
use rayon::prelude::*;
use tracing::debug;

use super::stats::normalize_by_max;

#[cfg(not(feature = "opencv"))]
use super::flow::FarnebackFlow;
#[cfg(not(feature = "opencv"))]
use super::imgops::to_gray;

#[cfg(feature = "opencv")]
use super::cv;
#[cfg(feature = "opencv")]
use tracing::warn;

/// Farneback parameters.
#[derive(Debug, Clone)]
pub struct FarnebackParams {
    /// Scale between pyramid levels (0.5 = classical pyramid)
    pub pyr_scale: f32,
    /// Number of pyramid levels, including the full-resolution image
    pub levels: usize,
    /// Averaging window side in pixels
    pub win_size: usize,
    /// Refinement iterations per level
    pub iterations: usize,
    /// Polynomial neighbourhood radius
    pub poly_n: usize,
    /// Gaussian sigma of the polynomial applicability
    pub poly_sigma: f32,
}

impl Default for FarnebackParams {
    fn default() -> Self {
        Self {
            pyr_scale: 0.5,
            levels: 3,
            win_size: 15,
            iterations: 3,
            poly_n: 5,
            poly_sigma: 1.2,
        }
    }
}

/// Motion estimator producing one score per frame.
///
/// The first frame has no predecessor and scores 0. Frame `i > 0` scores the
/// mean flow magnitude between frames `i - 1` and `i`. The series is then
/// normalised by its own maximum.
#[derive(Debug, Clone, Default)]
pub struct MotionEstimator {
    #[cfg(not(feature = "opencv"))]
    flow: FarnebackFlow,
    #[cfg(feature = "opencv")]
    params: FarnebackParams,
}

impl MotionEstimator {
    #[cfg(not(feature = "opencv"))]
    pub fn new(params: FarnebackParams) -> Self {
        Self {
            flow: FarnebackFlow::new(params),
        }
    }

    #[cfg(feature = "opencv")]
    pub fn new(params: FarnebackParams) -> Self {
        Self { params }
    }

    /// Raw mean flow magnitudes in pixels, first entry 0.
    pub fn raw_magnitudes(&self, frames: &[RgbImage]) -> Vec<f64> {
        if frames.is_empty() {
            return Vec::new();
        }

        let mut magnitudes = vec![0.0];
        magnitudes.extend(self.pair_magnitudes(frames));

        debug!(
            frames = frames.len(),
            peak = magnitudes.iter().copied().fold(0.0, f64::max),
            "Computed optical flow magnitudes"
        );
        magnitudes
    }

    #[cfg(not(feature = "opencv"))]
    fn pair_magnitudes(&self, frames: &[RgbImage]) -> Vec<f64> {
        // Each frame is expanded once and shared by both pairs it belongs to.
        let pyramids: Vec<_> = frames
            .par_iter()
            .map(|frame| self.flow.expand_pyramid(&to_gray(frame)))
            .collect();

        pyramids
            .par_windows(2)
            .map(|pair| {
                if pair[0].first().map(|l| l.dim()) != pair[1].first().map(|l| l.dim()) {
                    return 0.0;
                }
                self.flow.flow(&pair[0], &pair[1]).mean_magnitude()
            })
            .collect()
    }

    #[cfg(feature = "opencv")]
    fn pair_magnitudes(&self, frames: &[RgbImage]) -> Vec<f64> {
        frames
            .par_windows(2)
            .enumerate()
            .map(|(i, pair)| {
                if pair[0].dimensions() != pair[1].dimensions() {
                    return 0.0;
                }
                match cv::mean_flow_magnitude(&pair[0], &pair[1], &self.params) {
                    Ok(m) if m.is_finite() => m,
                    Ok(_) => 0.0,
                    Err(e) => {
                        warn!(frame = i + 1, error = %e, "Optical flow failed");
                        0.0
                    }
                }
            })
            .collect()
    }

    /// Motion series normalised into [0, 1].
    pub fn score_frames(&self, frames: &[RgbImage]) -> Vec<f64> {
        normalize_by_max(&self.raw_magnitudes(frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn textured(w: u32, h: u32, shift: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let xs = x as f32 - shift as f32;
            let v = 128.0 + 50.0 * (xs / 4.0).sin() + 50.0 * (y as f32 / 5.0).cos();
            let v = v.clamp(0.0, 255.0) as u8;
            Rgb([v, v, v])
        })
    }

    #[test]
    fn test_static_frames_score_zero() {
        let frames = vec![textured(48, 40, 0); 4];
        let scores = MotionEstimator::default().score_frames(&frames);
        assert_eq!(scores.len(), 4);
        assert!(scores.iter().all(|s| *s < 1e-3));
    }

    #[test]
    fn test_first_frame_zero_and_normalized() {
        let frames = vec![textured(48, 40, 0), textured(48, 40, 0), textured(48, 40, 2)];
        let scores = MotionEstimator::default().score_frames(&frames);
        assert_eq!(scores[0], 0.0);
        assert!(scores[2] > 0.99 && scores[2] <= 1.0);
        assert!(scores[1] < scores[2]);
    }

    #[test]
    fn test_mismatched_sizes_score_zero() {
        let frames = vec![textured(48, 40, 0), textured(32, 24, 2)];
        let raw = MotionEstimator::default().raw_magnitudes(&frames);
        assert_eq!(raw, vec![0.0, 0.0]);
    }

    #[test]
    fn test_single_and_empty() {
        let estimator = MotionEstimator::default();
        assert_eq!(estimator.score_frames(&[textured(16, 16, 0)]), vec![0.0]);
        assert!(estimator.score_frames(&[]).is_empty());
    }
}
