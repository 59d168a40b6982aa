//! Analysis configuration.

use adscore_models::{AgeGroup, CreativeGoal, SceneChangeMethod, ThresholdMode};

use crate::attention::scene_change::DEFAULT_WINDOW_SECS;
use crate::sampler::{clamp_sampling_fps, DEFAULT_ANALYSIS_WIDTH};

/// Options for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Frames sampled per second of video (clamped to 1-6)
    pub sampling_fps: f64,
    /// Creative goal selecting the pacing target
    pub goal: CreativeGoal,
    /// Audience profile
    pub age_group: AgeGroup,
    /// Feature used for scene-change deltas
    pub scene_method: SceneChangeMethod,
    /// Cut threshold rule
    pub threshold_mode: ThresholdMode,
    /// Cut-rate window in seconds
    pub cut_window_secs: f64,
    /// Override for the pacing sensitivity
    pub lambda: Option<f64>,
    /// Override for the target cut rate
    pub f_star: Option<f64>,
    /// Score saliency by centre-weighted overlap instead of the 95th percentile
    pub center_bias: bool,
    /// Width frames are scaled to before analysis
    pub analysis_width: u32,
    /// Stop sampling after this many frames
    pub max_frames: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sampling_fps: 2.0,
            goal: CreativeGoal::Hook,
            age_group: AgeGroup::General,
            scene_method: SceneChangeMethod::Histogram,
            threshold_mode: ThresholdMode::Zscore,
            cut_window_secs: DEFAULT_WINDOW_SECS,
            lambda: None,
            f_star: None,
            center_bias: true,
            analysis_width: DEFAULT_ANALYSIS_WIDTH,
            max_frames: None,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AnalysisConfig {
    /// Create config from `ADSCORE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup. Unparseable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            sampling_fps: clamp_sampling_fps(
                lookup("ADSCORE_FPS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.sampling_fps),
            ),
            goal: lookup("ADSCORE_GOAL")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.goal),
            age_group: lookup("ADSCORE_AGE_GROUP")
                .map(|s| AgeGroup::from_key(&s))
                .unwrap_or(defaults.age_group),
            scene_method: lookup("ADSCORE_SCENE_METHOD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.scene_method),
            threshold_mode: lookup("ADSCORE_THRESHOLD_MODE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.threshold_mode),
            cut_window_secs: lookup("ADSCORE_CUT_WINDOW_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|v: &f64| v.is_finite() && *v > 0.0)
                .unwrap_or(defaults.cut_window_secs),
            lambda: lookup("ADSCORE_LAMBDA").and_then(|s| s.parse().ok()),
            f_star: lookup("ADSCORE_F_STAR").and_then(|s| s.parse().ok()),
            center_bias: lookup("ADSCORE_CENTER_BIAS")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.center_bias),
            analysis_width: lookup("ADSCORE_ANALYSIS_WIDTH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.analysis_width),
            max_frames: lookup("ADSCORE_MAX_FRAMES")
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0),
        }
    }

    /// Sampling rate after clamping.
    pub fn effective_fps(&self) -> f64 {
        clamp_sampling_fps(self.sampling_fps)
    }
}
