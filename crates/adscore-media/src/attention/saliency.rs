//! Per-frame visual saliency and center-biased concentration.
//!
//! # Strategy chain
//! Saliency maps are produced by an ordered list of strategies; the first one
//! that returns a usable map wins:
//! 1. [`SpectralResidual`] - frequency-domain residual (fast, approximate);
//!    OpenCV's implementation under the `opencv` feature, `rustfft` otherwise
//! 2. [`FineGrained`] - multi-scale center-surround intensity contrast
//!
//! If every strategy fails the frame gets an all-zero map. This is logged as
//! degraded and counted, never raised.
//!
//! # Concentration
//! The map is reduced to a scalar by its overlap with a Gaussian centred on
//! the frame (sigma = min(w, h) / 6), divided by the total saliency mass.

use image::RgbImage;
use ndarray::Array2;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(not(feature = "opencv"))]
use rustfft::{num_complex::Complex, FftPlanner};

#[cfg(feature = "opencv")]
use super::cv;
use super::imgops::{box_blur, to_gray};
#[cfg(not(feature = "opencv"))]
use super::imgops::{box_kernel, convolve_separable, gaussian_blur, resize};
use super::stats::{percentile, EPSILON};

/// Reason a saliency strategy could not produce a map.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SaliencyError {
    #[error("frame too small ({width}x{height})")]
    FrameTooSmall { width: usize, height: usize },

    #[error("non-finite values in {0}")]
    NonFinite(&'static str),

    #[error("map has no saliency mass")]
    Flat,

    #[error("{0} backend failed")]
    Backend(&'static str),
}

/// A method that turns a luma plane into a raw saliency map of the same size.
pub trait SaliencyStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn compute(&self, gray: &Array2<f32>) -> Result<Array2<f32>, SaliencyError>;
}

/// Spectral residual saliency (Hou & Zhang).
///
/// Works on a small square thumbnail; the map is blurred and resized back to
/// the frame size.
#[cfg(not(feature = "opencv"))]
#[derive(Debug, Clone)]
pub struct SpectralResidual {
    /// Side of the square working resolution
    pub working_size: usize,
    /// Post-blur sigma at the working resolution
    pub blur_sigma: f32,
}

#[cfg(not(feature = "opencv"))]
impl Default for SpectralResidual {
    fn default() -> Self {
        Self {
            working_size: 64,
            blur_sigma: 2.5,
        }
    }
}

#[cfg(not(feature = "opencv"))]
impl SpectralResidual {
    fn fft2(&self, data: &mut [Complex<f32>], inverse: bool) {
        let n = self.working_size;
        let mut planner = FftPlanner::<f32>::new();
        let fft = if inverse {
            planner.plan_fft_inverse(n)
        } else {
            planner.plan_fft_forward(n)
        };

        // Rows are contiguous.
        for row in data.chunks_mut(n) {
            fft.process(row);
        }

        let mut column = vec![Complex::new(0.0f32, 0.0); n];
        for x in 0..n {
            for y in 0..n {
                column[y] = data[y * n + x];
            }
            fft.process(&mut column);
            for y in 0..n {
                data[y * n + x] = column[y];
            }
        }
    }
}

#[cfg(not(feature = "opencv"))]
impl SaliencyStrategy for SpectralResidual {
    fn name(&self) -> &'static str {
        "spectral_residual"
    }

    fn compute(&self, gray: &Array2<f32>) -> Result<Array2<f32>, SaliencyError> {
        let (h, w) = gray.dim();
        if h < 2 || w < 2 {
            return Err(SaliencyError::FrameTooSmall {
                width: w,
                height: h,
            });
        }
        let n = self.working_size;
        let small = resize(gray, n, n);

        let mut spectrum: Vec<Complex<f32>> = small
            .iter()
            .map(|v| Complex::new(v / 255.0, 0.0))
            .collect();
        self.fft2(&mut spectrum, false);

        let log_amp = Array2::from_shape_fn((n, n), |(y, x)| {
            spectrum[y * n + x].norm().max(1e-12).ln()
        });
        let avg = convolve_separable(&log_amp, &box_kernel(1), &box_kernel(1));

        for y in 0..n {
            for x in 0..n {
                let residual = (log_amp[[y, x]] - avg[[y, x]]).exp();
                let phase = spectrum[y * n + x].arg();
                spectrum[y * n + x] = Complex::from_polar(residual, phase);
            }
        }
        self.fft2(&mut spectrum, true);

        let energy = Array2::from_shape_fn((n, n), |(y, x)| spectrum[y * n + x].norm_sqr());
        if energy.iter().any(|v| !v.is_finite()) {
            return Err(SaliencyError::NonFinite(self.name()));
        }

        let smoothed = gaussian_blur(&energy, self.blur_sigma);
        let map = resize(&smoothed, w, h);
        if map.iter().any(|v| !v.is_finite()) {
            return Err(SaliencyError::NonFinite(self.name()));
        }
        if map.iter().all(|v| *v <= 0.0) {
            return Err(SaliencyError::Flat);
        }
        Ok(map)
    }
}

/// Spectral residual saliency backed by OpenCV's
/// `StaticSaliencySpectralResidual`.
#[cfg(feature = "opencv")]
#[derive(Debug, Clone, Default)]
pub struct SpectralResidual;

#[cfg(feature = "opencv")]
impl SaliencyStrategy for SpectralResidual {
    fn name(&self) -> &'static str {
        "spectral_residual"
    }

    fn compute(&self, gray: &Array2<f32>) -> Result<Array2<f32>, SaliencyError> {
        let (h, w) = gray.dim();
        if h < 2 || w < 2 {
            return Err(SaliencyError::FrameTooSmall {
                width: w,
                height: h,
            });
        }
        let map = cv::spectral_residual(gray).map_err(|e| {
            debug!(error = %e, "OpenCV spectral residual failed");
            SaliencyError::Backend(self.name())
        })?;
        if map.dim() != (h, w) || map.iter().any(|v| !v.is_finite()) {
            return Err(SaliencyError::NonFinite(self.name()));
        }
        if map.iter().all(|v| *v <= 0.0) {
            return Err(SaliencyError::Flat);
        }
        Ok(map)
    }
}

/// Fine-grained center-surround contrast on intensity.
#[derive(Debug, Clone)]
pub struct FineGrained {
    /// Surround radii in pixels
    pub surround_radii: Vec<usize>,
}

impl Default for FineGrained {
    fn default() -> Self {
        Self {
            surround_radii: vec![2, 4, 8, 16],
        }
    }
}

impl SaliencyStrategy for FineGrained {
    fn name(&self) -> &'static str {
        "fine_grained"
    }

    fn compute(&self, gray: &Array2<f32>) -> Result<Array2<f32>, SaliencyError> {
        let (h, w) = gray.dim();
        if h == 0 || w == 0 {
            return Err(SaliencyError::FrameTooSmall {
                width: w,
                height: h,
            });
        }
        let mut map = Array2::<f32>::zeros((h, w));
        for &radius in &self.surround_radii {
            let surround = box_blur(gray, radius);
            for ((y, x), m) in map.indexed_iter_mut() {
                *m += (gray[[y, x]] - surround[[y, x]]).abs();
            }
        }
        if map.iter().any(|v| !v.is_finite()) {
            return Err(SaliencyError::NonFinite(self.name()));
        }
        // Below this the contrast is rounding noise from the box filters.
        if map.iter().all(|v| *v <= 1e-3) {
            return Err(SaliencyError::Flat);
        }
        Ok(map)
    }
}

/// A normalized saliency map and the strategy that produced it.
#[derive(Debug, Clone)]
pub struct SaliencyMap {
    /// Values in [0, 1], same size as the frame
    pub map: Array2<f32>,
    /// `None` when every strategy failed and the map is all zero
    pub strategy: Option<&'static str>,
}

impl SaliencyMap {
    pub fn is_degraded(&self) -> bool {
        self.strategy.is_none()
    }
}

/// Saliency scores for a whole sample.
#[derive(Debug, Clone, Default)]
pub struct SaliencySeries {
    /// Concentration score per frame, in [0, 1]
    pub scores: Vec<f64>,
    /// Frames that fell back to the all-zero map
    pub degraded_frames: usize,
}

/// Computes per-frame saliency maps and concentration scores.
pub struct SaliencyExtractor {
    strategies: Vec<Box<dyn SaliencyStrategy>>,
    center_bias: bool,
}

impl Default for SaliencyExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SaliencyExtractor {
    /// Spectral residual first, fine-grained second.
    pub fn new(center_bias: bool) -> Self {
        Self {
            strategies: vec![
                Box::new(SpectralResidual::default()),
                Box::new(FineGrained::default()),
            ],
            center_bias,
        }
    }

    /// Use a custom strategy list (tried in order).
    pub fn with_strategies(strategies: Vec<Box<dyn SaliencyStrategy>>, center_bias: bool) -> Self {
        Self {
            strategies,
            center_bias,
        }
    }

    /// Compute the normalized saliency map of a frame. Never fails.
    pub fn compute_map(&self, frame: &RgbImage) -> SaliencyMap {
        let gray = to_gray(frame);
        self.compute_map_gray(&gray)
    }

    fn compute_map_gray(&self, gray: &Array2<f32>) -> SaliencyMap {
        let mut last_error = None;
        for strategy in &self.strategies {
            match strategy.compute(gray) {
                Ok(mut map) => {
                    let peak = map.iter().copied().fold(0.0f32, f32::max);
                    if peak > 0.0 {
                        map.mapv_inplace(|v| (v / peak).max(0.0));
                    }
                    return SaliencyMap {
                        map,
                        strategy: Some(strategy.name()),
                    };
                }
                Err(e) => {
                    debug!(strategy = strategy.name(), reason = %e, "Saliency strategy failed");
                    last_error = Some(e);
                }
            }
        }

        if let Some(reason) = last_error {
            warn!(reason = %reason, "Saliency computation degraded, using zero map");
        }
        SaliencyMap {
            map: Array2::zeros(gray.dim()),
            strategy: None,
        }
    }

    /// Concentration score of a single frame.
    pub fn score_frame(&self, frame: &RgbImage) -> (f64, bool) {
        let map = self.compute_map(frame);
        (concentration(&map.map, self.center_bias), map.is_degraded())
    }

    /// Score every frame; frames are processed in parallel, order is preserved.
    pub fn score_frames(&self, frames: &[RgbImage]) -> SaliencySeries {
        let results: Vec<(f64, bool)> = frames.par_iter().map(|f| self.score_frame(f)).collect();
        let degraded_frames = results.iter().filter(|(_, degraded)| *degraded).count();
        SaliencySeries {
            scores: results.into_iter().map(|(score, _)| score).collect(),
            degraded_frames,
        }
    }
}

/// Reduce a saliency map to a scalar in [0, 1].
///
/// With `center_bias`, the share of saliency mass under a centred Gaussian;
/// otherwise the 95th-percentile saliency value.
pub fn concentration(map: &Array2<f32>, center_bias: bool) -> f64 {
    let (h, w) = map.dim();
    if h == 0 || w == 0 {
        return 0.0;
    }

    let score = if center_bias {
        let total: f64 = map.iter().map(|v| *v as f64).sum::<f64>() + EPSILON;
        let cx = w as f64 / 2.0;
        let cy = h as f64 / 2.0;
        let sigma = w.min(h) as f64 / 6.0;
        let denom = 2.0 * sigma * sigma;
        let weighted: f64 = map
            .indexed_iter()
            .map(|((y, x), v)| {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                *v as f64 * (-(dx * dx + dy * dy) / denom).exp()
            })
            .sum();
        weighted / total
    } else {
        let values: Vec<f64> = map.iter().map(|v| *v as f64).collect();
        percentile(&values, 95.0)
    };

    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
