#![deny(unreachable_patterns)]
//! Attention and pacing scoring for short video ads.
//!
//! This crate provides:
//! - FFprobe stream probing and FFmpeg rawvideo frame sampling
//! - Per-frame saliency, optical-flow motion and scene-change signals
//! - Goal- and audience-conditioned pacing scores
//! - Fusion into a time-aligned attention curve with key moments
//! - Rule-based grading with strengths, weaknesses and recommendations

pub mod attention;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod probe;
pub mod sampler;

pub use attention::{
    AgeGroupProfile, AgeGroupTable, EmbeddingError, FrameEmbedder, FusionEngine, FusionWeights,
    SemanticSeries, TimeDecay,
};
pub use config::AnalysisConfig;
pub use engine::{AnalysisOutcome, AttentionEngine, SemanticError, SemanticScorer, SignalSet};
pub use error::{MediaError, MediaResult};
pub use logging::RunLogger;
pub use probe::{probe_video, VideoInfo};
pub use sampler::{FrameSampler, VideoSample};
