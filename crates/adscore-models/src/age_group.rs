//! Target audience age groups.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Audience segment used to condition weights, thresholds and pacing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    /// 18-27
    GenZ,
    /// 28-43
    Millennial,
    /// 44-59
    GenX,
    /// 60+
    Boomer,
    /// 5-17
    Children,
    /// Mixed demographics
    #[default]
    General,
}

impl AgeGroup {
    pub const ALL: &'static [AgeGroup] = &[
        AgeGroup::GenZ,
        AgeGroup::Millennial,
        AgeGroup::GenX,
        AgeGroup::Boomer,
        AgeGroup::Children,
        AgeGroup::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::GenZ => "gen_z",
            AgeGroup::Millennial => "millennial",
            AgeGroup::GenX => "gen_x",
            AgeGroup::Boomer => "boomer",
            AgeGroup::Children => "children",
            AgeGroup::General => "general",
        }
    }

    /// Lenient lookup: unknown keys resolve to [`AgeGroup::General`].
    pub fn from_key(key: &str) -> AgeGroup {
        key.parse().unwrap_or_default()
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgeGroup {
    type Err = AgeGroupParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gen_z" => Ok(AgeGroup::GenZ),
            "millennial" => Ok(AgeGroup::Millennial),
            "gen_x" => Ok(AgeGroup::GenX),
            "boomer" => Ok(AgeGroup::Boomer),
            "children" => Ok(AgeGroup::Children),
            "general" => Ok(AgeGroup::General),
            _ => Err(AgeGroupParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown age group: {0}")]
pub struct AgeGroupParseError(String);
