//! Attention and pacing signals.
//!
//! Per-frame signal extraction, the audience profile table, fusion into an
//! attention curve and rule-based interpretation.
//!
//! # Components
//!
//! - [`saliency`]: spectral residual saliency with ordered fallbacks
//! - [`motion`]: mean optical-flow magnitude per frame
//! - [`scene_change`]: histogram/embedding deltas, cuts and cut rate
//! - [`pacing`]: goal-conditioned pacing score
//! - [`profiles`]: age-group weights, decay, thresholds and pacing targets
//! - [`fusion`]: weighted, decayed attention curve with key moments
//! - [`interpreter`]: grade, strengths, weaknesses, recommendations
//!
//! Built with the `opencv` feature, optical flow, spectral residual saliency
//! and color histograms run on OpenCV (`cv`); otherwise on the pure-Rust
//! implementations in `flow`, [`saliency`] and [`scene_change`].

#[cfg(feature = "opencv")]
pub mod cv;
#[cfg(not(feature = "opencv"))]
pub mod flow;
pub mod fusion;
pub mod imgops;
pub mod interpreter;
pub mod motion;
pub mod pacing;
pub mod profiles;
pub mod saliency;
pub mod scene_change;
pub mod stats;

#[cfg(not(feature = "opencv"))]
pub use flow::{FarnebackFlow, FlowField};
pub use fusion::{FusionEngine, FusionInputs, FusionResult, SemanticSeries};
pub use interpreter::interpret;
pub use motion::{FarnebackParams, MotionEstimator};
pub use pacing::{pacing_score, pacing_series, PacingScorer};
pub use profiles::{AgeGroupProfile, AgeGroupTable, FusionWeights, GoalPacing, Thresholds, TimeDecay};
pub use saliency::{
    concentration, FineGrained, SaliencyError, SaliencyExtractor, SaliencySeries,
    SaliencyStrategy, SpectralResidual,
};
pub use scene_change::{
    cut_rate_series, EmbeddingError, FrameEmbedder, FrameFeature, SceneChangeDetector,
    SceneChangeSeries,
};
