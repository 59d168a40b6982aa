//! Score report produced by one analysis run.
//!
//! Field names follow the JSON scorecard consumed by the presentation layer
//! (`OverallAttentionScore`, `KeyMoments`, ...). Scalars that are shown to users
//! are rounded to three decimals when the report is built, so a report
//! survives a JSON round trip unchanged.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{AgeGroup, CreativeGoal, Interpretation, SceneChangeMethod};

/// Round to three decimal places.
pub fn round3(value: f64) -> f64 {
    if value.is_finite() {
        (value * 1000.0).round() / 1000.0
    } else {
        0.0
    }
}

/// Pacing target and sensitivity used for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PacingParams {
    /// Target cut rate (cuts per second)
    pub f_star: f64,
    /// Gaussian sensitivity around the target
    pub lambda: f64,
}

/// A high-attention timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeyMoment {
    /// Timestamp in seconds
    pub time: f64,
    /// Attention curve value at that timestamp (0-1)
    pub score: f64,
}

/// Scalar summary of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ScoreReport {
    /// 0.6 x opening mean + 0.4 x full mean, rounded to 3 decimals
    pub overall_attention_score: f64,

    /// Mean of the first (up to) five curve values, rounded to 3 decimals
    #[serde(rename = "First5sRetention")]
    pub first_5s_retention: f64,

    /// Mean cut rate in cuts per second, rounded to 3 decimals
    pub avg_cut_rate: f64,

    pub goal: CreativeGoal,

    pub age_group: AgeGroup,

    pub pacing: PacingParams,

    /// Top three curve values, descending
    pub key_moments: Vec<KeyMoment>,

    pub frames_analyzed: usize,

    #[serde(rename = "SamplingFPS")]
    pub sampling_fps: f64,

    /// Scene-change method requested for the run
    pub scene_method: SceneChangeMethod,

    /// True when embedding features were unavailable and histograms were used
    #[serde(default)]
    pub scene_feature_fallback: bool,

    #[serde(default)]
    pub used_semantic_scoring: bool,

    /// Frames whose saliency fell back to an all-zero map
    #[serde(default)]
    pub degraded_saliency_frames: usize,
}

impl ScoreReport {
    /// Overall score as a percentage (0-100).
    pub fn score_percent(&self) -> f64 {
        self.overall_attention_score * 100.0
    }
}

/// Report plus its interpretation, as written to `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportDocument {
    #[serde(flatten)]
    pub report: ScoreReport,

    #[serde(rename = "ScoreInterpretation")]
    pub interpretation: Interpretation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> ScoreReport {
        ScoreReport {
            overall_attention_score: round3(0.712_345),
            first_5s_retention: round3(0.80149),
            avg_cut_rate: round3(0.25),
            goal: CreativeGoal::Explainer,
            age_group: AgeGroup::Millennial,
            pacing: PacingParams {
                f_star: 0.3,
                lambda: 1.2,
            },
            key_moments: vec![
                KeyMoment {
                    time: 1.5,
                    score: 0.91,
                },
                KeyMoment {
                    time: 0.0,
                    score: 0.88,
                },
                KeyMoment {
                    time: 4.0,
                    score: 0.88,
                },
            ],
            frames_analyzed: 30,
            sampling_fps: 2.0,
            scene_method: SceneChangeMethod::Histogram,
            scene_feature_fallback: false,
            used_semantic_scoring: false,
            degraded_saliency_frames: 0,
        }
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(0.712_345), 0.712);
        assert_eq!(round3(0.0005), 0.001);
        assert_eq!(round3(f64::NAN), 0.0);
    }

    #[test]
    fn test_report_field_names() {
        let json = serde_json::to_value(sample_report()).unwrap();
        assert!(json.get("OverallAttentionScore").is_some());
        assert!(json.get("First5sRetention").is_some());
        assert!(json.get("SamplingFPS").is_some());
        assert_eq!(json["Pacing"]["f_star"], 0.3);
        assert_eq!(json["AgeGroup"], "millennial");
    }

    #[test]
    fn test_report_json_round_trip() {
        let report = sample_report();
        let json = serde_json::to_string(&report).unwrap();
        let parsed: ScoreReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
        let times: Vec<f64> = parsed.key_moments.iter().map(|m| m.time).collect();
        assert_eq!(times, vec![1.5, 0.0, 4.0]);
    }
}
