//! Analysis metrics.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the embedding binary.

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Frames kept by the sampler.
    pub const FRAMES_SAMPLED_TOTAL: &str = "adscore_frames_sampled_total";

    /// Frames whose saliency fell back to the all-zero map.
    pub const SALIENCY_DEGRADED_TOTAL: &str = "adscore_saliency_degraded_frames_total";

    /// Cuts detected by scene-change analysis, by feature method.
    pub const CUTS_DETECTED_TOTAL: &str = "adscore_cuts_detected_total";

    /// Completed analyses by goal and age group.
    pub const ANALYSES_TOTAL: &str = "adscore_analyses_total";

    /// Wall time of a full analysis run.
    pub const RUN_DURATION_SECONDS: &str = "adscore_run_duration_seconds";

    /// Overall attention score distribution.
    pub const OVERALL_SCORE: &str = "adscore_overall_attention_score";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record frames kept by the sampler.
pub fn record_frames_sampled(count: usize) {
    counter!(names::FRAMES_SAMPLED_TOTAL).increment(count as u64);
}

/// Record saliency degradations for one run.
pub fn record_degraded_saliency(count: usize) {
    if count > 0 {
        counter!(names::SALIENCY_DEGRADED_TOTAL).increment(count as u64);
    }
}

/// Record detected cuts.
pub fn record_cuts(method: &str, count: usize) {
    counter!(
        names::CUTS_DETECTED_TOTAL,
        "method" => method.to_string()
    )
    .increment(count as u64);
}

/// Record a completed analysis.
pub fn record_analysis(goal: &str, age_group: &str, overall: f64, duration_secs: f64) {
    counter!(
        names::ANALYSES_TOTAL,
        "goal" => goal.to_string(),
        "age_group" => age_group.to_string()
    )
    .increment(1);

    histogram!(names::RUN_DURATION_SECONDS).record(duration_secs);
    histogram!(
        names::OVERALL_SCORE,
        "goal" => goal.to_string()
    )
    .record(overall);
}

// =============================================================================
// Tests
// =============================================================================
