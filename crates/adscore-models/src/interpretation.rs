//! Human-readable interpretation of a score report.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter grade, ordered `D < C < B < A`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Grade {
    D,
    C,
    B,
    A,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }

    /// Rating label shown next to the grade.
    pub fn rating(&self) -> &'static str {
        match self {
            Grade::A => "Excellent",
            Grade::B => "Good",
            Grade::C => "Fair",
            Grade::D => "Needs Improvement",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Quality of the opening seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HookQuality {
    Poor,
    Weak,
    Good,
    Excellent,
}

/// How the measured cut rate compares to the goal's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PacingFit {
    Aligned,
    TooFast,
    TooSlow,
}

/// Structured explanation; every field is always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetailedExplanation {
    pub summary: String,
    pub hook_analysis: String,
    pub pacing_analysis: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Grade, rating and explanation derived from a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Interpretation {
    pub rating: String,
    pub grade: Grade,
    /// Overall score rounded to 3 decimals
    pub overall_score: f64,
    /// e.g. "71.2%"
    pub score_percentage: String,
    pub hook_quality: HookQuality,
    pub pacing_fit: PacingFit,
    pub performance_prediction: String,
    pub detailed_explanation: DetailedExplanation,
    /// Display name of the age group, when one was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_ordering() {
        assert!(Grade::D < Grade::C);
        assert!(Grade::C < Grade::B);
        assert!(Grade::B < Grade::A);
    }

    #[test]
    fn test_grade_rating_labels() {
        assert_eq!(Grade::A.rating(), "Excellent");
        assert_eq!(Grade::D.rating(), "Needs Improvement");
    }

    #[test]
    fn test_pacing_fit_serde() {
        let json = serde_json::to_string(&PacingFit::TooFast).unwrap();
        assert_eq!(json, "\"too_fast\"");
    }
}
