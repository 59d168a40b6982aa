//! Shared data models for the ad attention scoring engine.
//!
//! This crate provides Serde-serializable types for:
//! - Analysis options (creative goal, age group, scene-change method)
//! - The score report produced by one analysis run
//! - The human-readable interpretation attached to a report

pub mod age_group;
pub mod goal;
pub mod interpretation;
pub mod report;

// Re-export common types
pub use age_group::{AgeGroup, AgeGroupParseError};
pub use goal::{
    CreativeGoal, CreativeGoalParseError, SceneChangeMethod, SceneChangeMethodParseError,
    ThresholdMode, ThresholdModeParseError,
};
pub use interpretation::{DetailedExplanation, Grade, HookQuality, Interpretation, PacingFit};
pub use report::{round3, KeyMoment, PacingParams, ReportDocument, ScoreReport};
