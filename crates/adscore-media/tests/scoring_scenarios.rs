//! End-to-end scoring scenarios on precomputed signals.

use std::sync::Arc;

use adscore_media::attention::scene_change::{cut_rate_series, SceneChangeSeries};
use adscore_media::{AgeGroupTable, AnalysisConfig, AttentionEngine, SemanticSeries, SignalSet};
use adscore_models::{AgeGroup, CreativeGoal, PacingFit, ReportDocument};

fn engine(goal: CreativeGoal, age_group: AgeGroup) -> AttentionEngine {
    AttentionEngine::new(
        AnalysisConfig {
            goal,
            age_group,
            ..AnalysisConfig::default()
        },
        Arc::new(AgeGroupTable::builtin()),
    )
}

fn quiet_signals(n: usize) -> SignalSet {
    let cuts = vec![false; n - 1];
    SignalSet {
        timestamps: (0..n).map(|i| i as f64 * 0.5).collect(),
        sampling_fps: 2.0,
        saliency: vec![0.5; n],
        motion: vec![0.0; n],
        scene: SceneChangeSeries {
            deltas: vec![0.1; n - 1],
            cut_rate: cut_rate_series(&cuts, 2.0, 2.0),
            cuts,
            threshold: 0.1 + 1e-6,
            feature_fallback: false,
        },
        semantic: SemanticSeries::Absent,
        degraded_saliency_frames: 0,
    }
}

#[test]
fn calm_brand_static_ad() {
    let engine = engine(CreativeGoal::CalmBrand, AgeGroup::General);
    let outcome = engine.score_signals(quiet_signals(10)).unwrap();

    assert_eq!(outcome.report.pacing.f_star, 0.2);
    assert_eq!(outcome.report.pacing.lambda, 1.0);
    assert_eq!(outcome.report.avg_cut_rate, 0.0);
    assert_eq!(outcome.report.frames_analyzed, 10);
    assert_eq!(outcome.pacing.len(), 10);
    for p in &outcome.pacing {
        assert!((p - 0.9608).abs() < 1e-4);
    }

    // Saliency normalises to ~1, motion stays 0, pacing ~0.9608 at weight 0.1.
    let expected_first = (0.5 / (0.5 + 1e-6) * 0.5 + 0.1 * (-0.04f64).exp()) * 1.2;
    assert!((outcome.curve[0] - expected_first).abs() < 1e-9);
    assert!(outcome.curve.windows(2).all(|w| w[0] >= w[1]));

    // Same input, same bytes.
    let again = engine.score_signals(quiet_signals(10)).unwrap();
    assert_eq!(
        serde_json::to_string(&outcome.document()).unwrap(),
        serde_json::to_string(&again.document()).unwrap()
    );
    assert_eq!(outcome.curve, again.curve);
}

#[test]
fn children_hook_cut_too_fast() {
    let n = 12;
    let mut signals = quiet_signals(n);
    signals.scene.cut_rate = vec![3.0; n];

    let outcome = engine(CreativeGoal::Hook, AgeGroup::Children)
        .score_signals(signals)
        .unwrap();

    assert_eq!(outcome.report.pacing.f_star, 0.7);
    assert_eq!(outcome.report.avg_cut_rate, 3.0);
    let interpretation = &outcome.interpretation;
    assert_eq!(interpretation.pacing_fit, PacingFit::TooFast);
    assert!(interpretation
        .detailed_explanation
        .pacing_analysis
        .starts_with("Pacing is too fast for Hook (fast-paced, attention-grabbing) goal."));
    assert!(interpretation
        .detailed_explanation
        .recommendations
        .iter()
        .any(|r| r.starts_with("Maximize motion and fast pacing - Children")));
    assert_eq!(interpretation.age_group.as_deref(), Some("Children (5-17)"));
}

#[test]
fn report_document_round_trip() {
    let mut signals = quiet_signals(8);
    signals.saliency = vec![0.2, 0.9, 0.4, 0.9, 0.1, 0.3, 0.8, 0.5];
    let outcome = engine(CreativeGoal::Explainer, AgeGroup::GenX)
        .score_signals(signals)
        .unwrap();
    let document = outcome.document();

    let json = serde_json::to_string_pretty(&document).unwrap();
    assert!(json.contains("\"OverallAttentionScore\""));
    assert!(json.contains("\"SamplingFPS\""));
    assert!(json.contains("\"ScoreInterpretation\""));

    let parsed: ReportDocument = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, document);
    let times: Vec<f64> = parsed.report.key_moments.iter().map(|k| k.time).collect();
    assert_eq!(times, vec![0.5, 1.5, 3.0]);
}

#[test]
fn overrides_replace_profile_targets() {
    let engine = AttentionEngine::new(
        AnalysisConfig {
            goal: CreativeGoal::Hook,
            age_group: AgeGroup::Boomer,
            f_star: Some(1.25),
            ..AnalysisConfig::default()
        },
        Arc::new(AgeGroupTable::builtin()),
    );
    let outcome = engine.score_signals(quiet_signals(4)).unwrap();
    assert_eq!(outcome.report.pacing.f_star, 1.25);
    assert_eq!(outcome.report.pacing.lambda, 0.8);
}
