//! Invariants of the scoring stages across input sizes.

use adscore_media::attention::fusion::{overall_score, top_indices, FusionInputs};
use adscore_media::attention::interpreter::grade_for;
use adscore_media::attention::scene_change::{cut_rate_series, detect_cuts};
use adscore_media::attention::{pacing_score, Thresholds};
use adscore_media::{AgeGroupTable, FusionEngine, SemanticSeries};
use adscore_models::{AgeGroup, PacingParams, ThresholdMode};

/// Deterministic pseudo-random series in [0, scale).
fn series(n: usize, seed: u64, scale: f64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64 * scale
        })
        .collect()
}

#[test]
fn curve_is_bounded_for_every_profile() {
    let table = AgeGroupTable::builtin();
    for profile in table.iter() {
        for n in [1usize, 2, 4, 5, 6, 50] {
            let saliency = series(n, 1, 1.0);
            let motion = series(n, 2, 25.0);
            let semantic = SemanticSeries::Present(series(n, 3, 0.4));
            let pacing = series(n, 4, 1.5);
            let result = FusionEngine::from_profile(profile)
                .fuse(FusionInputs {
                    saliency: &saliency,
                    motion: &motion,
                    semantic: &semantic,
                    pacing: Some(&pacing),
                })
                .unwrap();
            assert_eq!(result.curve.len(), n);
            assert!(result.curve.iter().all(|v| (0.0..=1.0).contains(v)));
            assert_eq!(result.key_moments.len(), n.min(3));
        }
    }
}

#[test]
fn key_moments_dominate_the_rest() {
    for n in [3usize, 10, 50] {
        let curve = series(n, 5, 1.0);
        let top = top_indices(&curve, 3);
        let floor = top.iter().map(|i| curve[*i]).fold(f64::INFINITY, f64::min);
        for (i, v) in curve.iter().enumerate() {
            if !top.contains(&i) {
                assert!(*v <= floor);
            }
        }
    }
    assert_eq!(top_indices(&[0.5, 0.9, 0.5, 0.9, 0.5], 3), vec![1, 3, 0]);
}

#[test]
fn overall_matches_definition() {
    for n in [1usize, 4, 50] {
        let curve = series(n, 7, 1.0);
        let head = &curve[..n.min(5)];
        let expected = 0.6 * head.iter().sum::<f64>() / head.len() as f64
            + 0.4 * curve.iter().sum::<f64>() / n as f64;
        assert!((overall_score(&curve) - expected).abs() < 1e-12);
    }
}

#[test]
fn pacing_peaks_at_target_and_is_symmetric() {
    let table = AgeGroupTable::builtin();
    for profile in table.iter() {
        for params in [profile.pacing.hook, profile.pacing.explainer, profile.pacing.calm_brand] {
            assert_eq!(pacing_score(params.f_star, params), 1.0);
            let mut last = 1.0;
            for step in 1..20 {
                let d = step as f64 * 0.25;
                let above = pacing_score(params.f_star + d, params);
                let below = pacing_score(params.f_star - d, params);
                assert!((above - below).abs() < 1e-12);
                assert!(above <= last);
                last = above;
            }
        }
    }
    let p = PacingParams {
        f_star: 1.5,
        lambda: 2.0,
    };
    assert!(pacing_score(10.0, p) >= 0.0);
}

#[test]
fn cut_rate_is_non_negative_and_aligned() {
    for n in [2usize, 3, 10, 40] {
        let deltas = series(n - 1, 11, 2.0);
        for mode in [ThresholdMode::Zscore, ThresholdMode::Percentile] {
            let (cuts, _) = detect_cuts(&deltas, mode);
            for fps in [1.0, 2.0, 6.0] {
                let rate = cut_rate_series(&cuts, fps, 2.0);
                assert_eq!(rate.len(), n);
                assert!(rate.iter().all(|r| *r >= 0.0 && r.is_finite()));
            }
        }
    }
}

#[test]
fn constant_deltas_never_cut() {
    let (cuts, _) = detect_cuts(&[0.42; 30], ThresholdMode::Zscore);
    let rate = cut_rate_series(&cuts, 2.0, 2.0);
    assert!(rate.iter().all(|r| *r == 0.0));
}

#[test]
fn grade_is_monotone_for_every_profile() {
    let table = AgeGroupTable::builtin();
    let mut all: Vec<Thresholds> = table.iter().map(|p| p.thresholds).collect();
    all.push(Thresholds::default());
    for thresholds in all {
        let mut last = grade_for(0.0, &thresholds);
        for i in 1..=1000 {
            let grade = grade_for(i as f64 / 1000.0, &thresholds);
            assert!(grade >= last);
            last = grade;
        }
    }
}

#[test]
fn unknown_profile_key_is_general() {
    let table = AgeGroupTable::builtin();
    assert_eq!(table.profile("unknown_key"), table.profile("general"));
    assert_eq!(table.profile("unknown_key").key, AgeGroup::General);
}
