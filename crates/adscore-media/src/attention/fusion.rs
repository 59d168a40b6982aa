//! Multi-signal fusion into a single attention curve.
//!
//! `curve(t) = clip((w_s*S + w_m*M + w_c*C + w_p*P)(t) * decay(t), 0, 1)`
//!
//! S, M and C are normalised by their own maximum; P is clipped to [0, 1].
//! A missing semantic series contributes a constant 0.5 at weight 0 and a
//! missing pacing series a constant 0.7 at weight 0. The decay envelope runs
//! linearly from `start` on the first frame to `end` on the last.

use serde::Serialize;

use super::profiles::{AgeGroupProfile, FusionWeights, TimeDecay};
use super::stats::{clip, linspace, mean, normalize_by_max, sanitize};
use crate::error::{ensure_len, MediaResult};

/// Frames counted as the opening hook.
pub const HOOK_FRAMES: usize = 5;

/// Number of key moments reported.
pub const KEY_MOMENT_COUNT: usize = 3;

const HOOK_WEIGHT: f64 = 0.6;
const FULL_WEIGHT: f64 = 0.4;
const ABSENT_SEMANTIC: f64 = 0.5;
const ABSENT_PACING: f64 = 0.7;

/// Prompt-similarity series from an external semantic scorer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SemanticSeries {
    Present(Vec<f64>),
    #[default]
    Absent,
}

impl SemanticSeries {
    pub fn is_present(&self) -> bool {
        matches!(self, SemanticSeries::Present(_))
    }
}

/// Signals entering fusion, all aligned to the same N frames.
#[derive(Debug, Clone, Copy)]
pub struct FusionInputs<'a> {
    pub saliency: &'a [f64],
    pub motion: &'a [f64],
    pub semantic: &'a SemanticSeries,
    pub pacing: Option<&'a [f64]>,
}

/// Fused curve and its summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionResult {
    /// Attention per frame in [0, 1]
    pub curve: Vec<f64>,
    /// 0.6 x opening mean + 0.4 x full mean
    pub overall: f64,
    /// Mean of the first [`HOOK_FRAMES`] values
    pub first_5s: f64,
    /// (frame index, score), descending score, ties by earlier index
    pub key_moments: Vec<(usize, f64)>,
}

/// Mean of the opening frames.
pub fn hook_mean(curve: &[f64]) -> f64 {
    mean(&curve[..curve.len().min(HOOK_FRAMES)])
}

/// Overall attention score of a curve.
pub fn overall_score(curve: &[f64]) -> f64 {
    HOOK_WEIGHT * hook_mean(curve) + FULL_WEIGHT * mean(curve)
}

/// Indices of the `k` highest values; ties keep the earlier index first.
pub fn top_indices(curve: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..curve.len()).collect();
    // sort_by is stable, so equal scores stay in index order
    order.sort_by(|a, b| curve[*b].total_cmp(&curve[*a]));
    order.truncate(k);
    order
}

/// Combines per-frame signals with fixed weights and a decay envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FusionEngine {
    weights: FusionWeights,
    decay: TimeDecay,
}

impl FusionEngine {
    pub fn new(weights: FusionWeights, decay: TimeDecay) -> Self {
        Self { weights, decay }
    }

    /// Weights and decay of an audience profile.
    pub fn from_profile(profile: &AgeGroupProfile) -> Self {
        Self::new(profile.weights, profile.time_decay)
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    pub fn decay(&self) -> TimeDecay {
        self.decay
    }

    /// Fuse the signals into an attention curve.
    ///
    /// Fails only when a series length differs from the saliency length.
    pub fn fuse(&self, inputs: FusionInputs<'_>) -> MediaResult<FusionResult> {
        let n = inputs.saliency.len();
        ensure_len("motion", n, inputs.motion.len())?;
        if let SemanticSeries::Present(values) = inputs.semantic {
            ensure_len("semantic", n, values.len())?;
        }
        if let Some(pacing) = inputs.pacing {
            ensure_len("pacing", n, pacing.len())?;
        }

        let saliency = normalize_by_max(inputs.saliency);
        let motion = normalize_by_max(inputs.motion);
        let (semantic, w_semantic) = match inputs.semantic {
            SemanticSeries::Present(values) => (normalize_by_max(values), self.weights.semantic),
            SemanticSeries::Absent => (vec![ABSENT_SEMANTIC; n], 0.0),
        };
        let (pacing, w_pacing) = match inputs.pacing {
            Some(values) => (clip(values, 0.0, 1.0), self.weights.pacing),
            None => (vec![ABSENT_PACING; n], 0.0),
        };

        let envelope = linspace(self.decay.start, self.decay.end, n);
        let raw: Vec<f64> = (0..n)
            .map(|i| {
                (self.weights.saliency * saliency[i]
                    + self.weights.motion * motion[i]
                    + w_semantic * semantic[i]
                    + w_pacing * pacing[i])
                    * envelope[i]
            })
            .collect();
        let curve = clip(&sanitize(&raw), 0.0, 1.0);

        let key_moments = top_indices(&curve, KEY_MOMENT_COUNT)
            .into_iter()
            .map(|i| (i, curve[i]))
            .collect();

        Ok(FusionResult {
            overall: overall_score(&curve),
            first_5s: hook_mean(&curve),
            key_moments,
            curve,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;

    fn fuse(s: &[f64], m: &[f64], p: Option<&[f64]>) -> FusionResult {
        FusionEngine::default()
            .fuse(FusionInputs {
                saliency: s,
                motion: m,
                semantic: &SemanticSeries::Absent,
                pacing: p,
            })
            .unwrap()
    }

    #[test]
    fn test_curve_length_and_range() {
        for n in [1usize, 4, 50] {
            let s: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin().abs() * 3.0).collect();
            let m: Vec<f64> = (0..n).map(|i| (i % 7) as f64).collect();
            let p = vec![1.0; n];
            let r = fuse(&s, &m, Some(&p));
            assert_eq!(r.curve.len(), n);
            assert!(r.curve.iter().all(|v| (0.0..=1.0).contains(v)));

            let expected = 0.6 * mean(&r.curve[..n.min(5)]) + 0.4 * mean(&r.curve);
            assert!((r.overall - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_clip_after_decay() {
        // 0.85 x 1.2 exceeds 1 on the first frame.
        let r = fuse(&[1.0, 1.0], &[1.0, 1.0], Some(&[1.0, 1.0]));
        assert_eq!(r.curve[0], 1.0);
        assert!((r.curve[1] - 0.85).abs() < 1e-5);
    }

    #[test]
    fn test_absent_semantic_has_no_effect() {
        let s = [0.2, 0.4, 0.9];
        let m = [0.0, 0.5, 0.1];
        let absent = fuse(&s, &m, None);
        let present_zero_weight = FusionEngine::new(
            FusionWeights {
                semantic: 0.0,
                ..FusionWeights::default()
            },
            TimeDecay::default(),
        )
        .fuse(FusionInputs {
            saliency: &s,
            motion: &m,
            semantic: &SemanticSeries::Present(vec![0.3, 0.9, 0.1]),
            pacing: None,
        })
        .unwrap();
        assert_eq!(absent.curve, present_zero_weight.curve);
    }

    #[test]
    fn test_key_moments_dominate_and_tie_break() {
        let s = [0.5, 1.0, 0.5, 1.0, 0.2, 0.5];
        let engine = FusionEngine::new(
            FusionWeights {
                saliency: 1.0,
                motion: 0.0,
                semantic: 0.0,
                pacing: 0.0,
            },
            TimeDecay { start: 1.0, end: 1.0 },
        );
        let r = engine
            .fuse(FusionInputs {
                saliency: &s,
                motion: &[0.0; 6],
                semantic: &SemanticSeries::Absent,
                pacing: None,
            })
            .unwrap();
        let idx: Vec<usize> = r.key_moments.iter().map(|(i, _)| *i).collect();
        assert_eq!(idx, vec![1, 3, 0]);
        let min_key = r.key_moments.iter().map(|(_, s)| *s).fold(f64::MAX, f64::min);
        for (i, v) in r.curve.iter().enumerate() {
            if !idx.contains(&i) {
                assert!(*v <= min_key);
            }
        }
    }

    #[test]
    fn test_length_mismatch() {
        let err = FusionEngine::default()
            .fuse(FusionInputs {
                saliency: &[0.1, 0.2],
                motion: &[0.1],
                semantic: &SemanticSeries::Absent,
                pacing: None,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            MediaError::InvalidSeriesLength { series: "motion", .. }
        ));
    }

    #[test]
    fn test_non_finite_inputs_sanitized() {
        let r = fuse(&[f64::NAN, 1.0], &[f64::INFINITY, 0.0], None);
        assert!(r.curve.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_fewer_than_three_frames() {
        let r = fuse(&[0.4, 0.8], &[0.0, 0.0], None);
        assert_eq!(r.key_moments.len(), 2);
        assert_eq!(r.key_moments[0].0, 1);
    }
}
