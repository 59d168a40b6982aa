//! Analysis option enums: creative goal, scene-change method, cut threshold mode.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Creative goal the ad is cut for. Selects the pacing target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum CreativeGoal {
    /// Fast-paced, attention-grabbing
    #[default]
    Hook,
    /// Moderate pacing, informative
    Explainer,
    /// Slow-paced, contemplative
    CalmBrand,
}

impl CreativeGoal {
    pub const ALL: &'static [CreativeGoal] = &[
        CreativeGoal::Hook,
        CreativeGoal::Explainer,
        CreativeGoal::CalmBrand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CreativeGoal::Hook => "hook",
            CreativeGoal::Explainer => "explainer",
            CreativeGoal::CalmBrand => "calm_brand",
        }
    }

    /// Descriptive name used in interpretation text.
    pub fn display_name(&self) -> &'static str {
        match self {
            CreativeGoal::Hook => "Hook (fast-paced, attention-grabbing)",
            CreativeGoal::Explainer => "Explainer (moderate pacing, informative)",
            CreativeGoal::CalmBrand => "Calm Brand (slow-paced, contemplative)",
        }
    }
}

impl fmt::Display for CreativeGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CreativeGoal {
    type Err = CreativeGoalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hook" => Ok(CreativeGoal::Hook),
            "explainer" => Ok(CreativeGoal::Explainer),
            "calm_brand" => Ok(CreativeGoal::CalmBrand),
            _ => Err(CreativeGoalParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown creative goal: {0}")]
pub struct CreativeGoalParseError(String);

/// Per-frame feature used for scene-change deltas.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SceneChangeMethod {
    /// Joint 8x8x8 color histogram
    #[default]
    Histogram,
    /// Learned visual embedding, falls back to histogram
    Embedding,
}

impl SceneChangeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneChangeMethod::Histogram => "histogram",
            SceneChangeMethod::Embedding => "embedding",
        }
    }
}

impl fmt::Display for SceneChangeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SceneChangeMethod {
    type Err = SceneChangeMethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "hist" and "clip" are the short names the original tooling used.
        match s.to_lowercase().as_str() {
            "histogram" | "hist" => Ok(SceneChangeMethod::Histogram),
            "embedding" | "clip" => Ok(SceneChangeMethod::Embedding),
            _ => Err(SceneChangeMethodParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown scene-change method: {0}")]
pub struct SceneChangeMethodParseError(String);

/// How the cut threshold is derived from the delta sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// mean + one standard deviation
    #[default]
    Zscore,
    /// 75th percentile
    Percentile,
}

impl ThresholdMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdMode::Zscore => "zscore",
            ThresholdMode::Percentile => "percentile",
        }
    }
}

impl fmt::Display for ThresholdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ThresholdMode {
    type Err = ThresholdModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zscore" => Ok(ThresholdMode::Zscore),
            "percentile" => Ok(ThresholdMode::Percentile),
            _ => Err(ThresholdModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown threshold mode: {0}")]
pub struct ThresholdModeParseError(String);
