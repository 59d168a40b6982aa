//! Scene-change detection and cut-rate series.
//!
//! # Algorithm
//!
//! 1. Compute a feature per sampled frame: an L2-normalised joint RGB
//!    histogram (8 bins per channel), or an embedding from an injected
//!    [`FrameEmbedder`] with the histogram kept as fallback
//! 2. Delta between consecutive frames: Euclidean distance of histograms, or
//!    cosine distance when both frames carry an embedding
//! 3. Mark a cut where the delta exceeds a z-score or 75th percentile threshold
//! 4. Convolve the cut indicator with a centred uniform window and scale by
//!    the sampling rate to get cuts per second

use std::sync::Arc;

use adscore_models::{SceneChangeMethod, ThresholdMode};
use image::RgbImage;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::stats::{mean, percentile, sanitize, std_dev, EPSILON};
use crate::metrics;

/// Bins per color channel.
pub const HIST_BINS: usize = 8;

/// Default cut-rate window in seconds.
pub const DEFAULT_WINDOW_SECS: f64 = 2.0;

/// Percentile used by [`ThresholdMode::Percentile`].
const CUT_PERCENTILE: f64 = 75.0;

/// Failure of an external frame embedding model.
#[derive(Debug, Error)]
#[error("Frame embedding failed: {0}")]
pub struct EmbeddingError(pub String);

/// Learned image embedding used as the alternate scene feature.
pub trait FrameEmbedder: Send + Sync {
    /// Model name for logs.
    fn name(&self) -> &str;

    /// Embed one RGB frame.
    fn embed(&self, frame: &RgbImage) -> Result<Vec<f64>, EmbeddingError>;
}

/// Feature vector of one frame.
#[derive(Debug, Clone)]
pub struct FrameFeature {
    pub histogram: Vec<f64>,
    pub embedding: Option<Vec<f64>>,
}

impl FrameFeature {
    pub fn from_histogram(histogram: Vec<f64>) -> Self {
        Self {
            histogram,
            embedding: None,
        }
    }
}

/// Scene-change analysis output.
#[derive(Debug, Clone, Default)]
pub struct SceneChangeSeries {
    /// Distances between consecutive frames (N - 1 values)
    pub deltas: Vec<f64>,
    /// Cut indicator per delta
    pub cuts: Vec<bool>,
    /// Threshold the deltas were compared against
    pub threshold: f64,
    /// Cuts per second, aligned to the N frames
    pub cut_rate: Vec<f64>,
    /// Embedding requested but histogram features were used for some frames
    pub feature_fallback: bool,
}

impl SceneChangeSeries {
    pub fn cut_count(&self) -> usize {
        self.cuts.iter().filter(|c| **c).count()
    }

    pub fn average_cut_rate(&self) -> f64 {
        mean(&self.cut_rate)
    }
}

/// L2-normalised joint RGB histogram with `HIST_BINS^3` entries, red-major.
#[cfg(not(feature = "opencv"))]
pub fn histogram_feature(frame: &RgbImage) -> Vec<f64> {
    let shift = 8 - HIST_BINS.trailing_zeros();
    let mut histogram = vec![0.0; HIST_BINS * HIST_BINS * HIST_BINS];

    for pixel in frame.pixels() {
        let [r, g, b] = pixel.0;
        let idx = ((r >> shift) as usize * HIST_BINS + (g >> shift) as usize) * HIST_BINS
            + (b >> shift) as usize;
        histogram[idx] += 1.0;
    }

    let norm = histogram.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for v in &mut histogram {
            *v /= norm;
        }
    }
    histogram
}

/// L2-normalised joint RGB histogram with `HIST_BINS^3` entries, red-major,
/// from `imgproc::calc_hist`. A failed call yields an all-zero histogram.
#[cfg(feature = "opencv")]
pub fn histogram_feature(frame: &RgbImage) -> Vec<f64> {
    match super::cv::color_histogram(frame, HIST_BINS as i32) {
        Ok(histogram) if histogram.len() == HIST_BINS * HIST_BINS * HIST_BINS => histogram,
        Ok(histogram) => {
            warn!(bins = histogram.len(), "Unexpected histogram size");
            vec![0.0; HIST_BINS * HIST_BINS * HIST_BINS]
        }
        Err(e) => {
            warn!(error = %e, "Histogram computation failed");
            vec![0.0; HIST_BINS * HIST_BINS * HIST_BINS]
        }
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|v| v * v).sum::<f64>().sqrt();
    let nb = b.iter().map(|v| v * v).sum::<f64>().sqrt();
    1.0 - dot / (na * nb + EPSILON)
}

/// Distance between two consecutive frame features.
pub fn feature_delta(prev: &FrameFeature, next: &FrameFeature) -> f64 {
    let d = match (&prev.embedding, &next.embedding) {
        (Some(a), Some(b)) if a.len() == b.len() => cosine_distance(a, b),
        _ => euclidean(&prev.histogram, &next.histogram),
    };
    if d.is_finite() {
        d.max(0.0)
    } else {
        0.0
    }
}

/// Deltas between consecutive features (N - 1 values).
pub fn compute_deltas(features: &[FrameFeature]) -> Vec<f64> {
    features
        .windows(2)
        .map(|pair| feature_delta(&pair[0], &pair[1]))
        .collect()
}

/// Threshold a delta must exceed to count as a cut.
pub fn cut_threshold(deltas: &[f64], mode: ThresholdMode) -> f64 {
    match mode {
        ThresholdMode::Zscore => mean(deltas) + std_dev(deltas) + EPSILON,
        ThresholdMode::Percentile => percentile(deltas, CUT_PERCENTILE),
    }
}

/// Cut indicator per delta and the threshold used.
pub fn detect_cuts(deltas: &[f64], mode: ThresholdMode) -> (Vec<bool>, f64) {
    let deltas = sanitize(deltas);
    let threshold = cut_threshold(&deltas, mode);
    let cuts = deltas.iter().map(|d| *d > threshold).collect();
    (cuts, threshold)
}

/// Cuts per second, aligned to N = `cuts.len() + 1` frames.
///
/// Uniform window of `max(1, round(fps * window_secs))` samples, centred
/// the way a zero-padded "same" convolution centres it. The first value is
/// repeated so the series lines up with the frames.
pub fn cut_rate_series(cuts: &[bool], fps: f64, window_secs: f64) -> Vec<f64> {
    if cuts.is_empty() {
        return vec![0.0];
    }

    let fps = if fps.is_finite() && fps > 0.0 { fps } else { 1.0 };
    let window = ((fps * window_secs).round() as usize).max(1);
    let offset = (window - 1) / 2;
    let len = cuts.len();

    let mut rate = Vec::with_capacity(len + 1);
    for i in 0..len {
        let hi = i + offset;
        let lo = hi.saturating_sub(window - 1);
        let events = (lo..=hi.min(len - 1)).filter(|j| cuts[*j]).count();
        rate.push(events as f64 / window as f64 * fps);
    }
    rate.insert(0, rate[0]);
    rate
}

/// Scene-change detector.
#[derive(Clone)]
pub struct SceneChangeDetector {
    method: SceneChangeMethod,
    threshold_mode: ThresholdMode,
    window_secs: f64,
    embedder: Option<Arc<dyn FrameEmbedder>>,
}

impl std::fmt::Debug for SceneChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneChangeDetector")
            .field("method", &self.method)
            .field("threshold_mode", &self.threshold_mode)
            .field("window_secs", &self.window_secs)
            .field("embedder", &self.embedder.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}

impl Default for SceneChangeDetector {
    fn default() -> Self {
        Self::new(SceneChangeMethod::Histogram, ThresholdMode::Zscore)
    }
}

impl SceneChangeDetector {
    pub fn new(method: SceneChangeMethod, threshold_mode: ThresholdMode) -> Self {
        Self {
            method,
            threshold_mode,
            window_secs: DEFAULT_WINDOW_SECS,
            embedder: None,
        }
    }

    /// Set the cut-rate window length.
    pub fn with_window_secs(mut self, window_secs: f64) -> Self {
        if window_secs.is_finite() && window_secs > 0.0 {
            self.window_secs = window_secs;
        }
        self
    }

    /// Attach the embedding model used by [`SceneChangeMethod::Embedding`].
    pub fn with_embedder(mut self, embedder: Arc<dyn FrameEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn method(&self) -> SceneChangeMethod {
        self.method
    }

    /// Features for every frame, plus whether embedding fell back to histograms.
    pub fn extract_features(&self, frames: &[RgbImage]) -> (Vec<FrameFeature>, bool) {
        let embedder = match (self.method, &self.embedder) {
            (SceneChangeMethod::Embedding, Some(embedder)) => Some(embedder.as_ref()),
            (SceneChangeMethod::Embedding, None) => {
                warn!("Embedding scene features requested without an embedder, using histograms");
                return (
                    frames
                        .par_iter()
                        .map(|f| FrameFeature::from_histogram(histogram_feature(f)))
                        .collect(),
                    !frames.is_empty(),
                );
            }
            (SceneChangeMethod::Histogram, _) => None,
        };

        let features: Vec<FrameFeature> = frames
            .par_iter()
            .enumerate()
            .map(|(idx, frame)| {
                let embedding = embedder.and_then(|e| match e.embed(frame) {
                    Ok(v) if !v.is_empty() => Some(v),
                    Ok(_) => None,
                    Err(err) => {
                        debug!(frame = idx, error = %err, "Embedding failed, using histogram");
                        None
                    }
                });
                FrameFeature {
                    histogram: histogram_feature(frame),
                    embedding,
                }
            })
            .collect();

        let fallback = embedder.is_some() && features.iter().any(|f| f.embedding.is_none());
        if fallback {
            warn!(
                failed = features.iter().filter(|f| f.embedding.is_none()).count(),
                total = features.len(),
                "Embedding unavailable for some frames, histogram features used"
            );
        }
        (features, fallback)
    }

    /// Full scene-change analysis of the sampled frames.
    pub fn analyze(&self, frames: &[RgbImage], fps: f64) -> SceneChangeSeries {
        let (features, fallback) = self.extract_features(frames);
        self.analyze_features(&features, fps, fallback)
    }

    /// Scene-change analysis of precomputed features.
    pub fn analyze_features(
        &self,
        features: &[FrameFeature],
        fps: f64,
        feature_fallback: bool,
    ) -> SceneChangeSeries {
        if features.is_empty() {
            return SceneChangeSeries::default();
        }

        let deltas = compute_deltas(features);
        let (cuts, threshold) = detect_cuts(&deltas, self.threshold_mode);
        let cut_rate = cut_rate_series(&cuts, fps, self.window_secs);

        let series = SceneChangeSeries {
            deltas,
            cuts,
            threshold,
            cut_rate,
            feature_fallback,
        };

        metrics::record_cuts(self.method.as_str(), series.cut_count());
        info!(
            method = %self.method,
            threshold_mode = %self.threshold_mode,
            cuts = series.cut_count(),
            threshold = series.threshold,
            avg_cut_rate = series.average_cut_rate(),
            "Scene-change analysis complete"
        );
        series
    }
}
