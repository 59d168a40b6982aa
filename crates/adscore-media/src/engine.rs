//! Analysis orchestration.
//!
//! Runs the stages in order for one video:
//! sampler -> {saliency, motion, scene change} -> pacing -> fusion -> interpreter.
//!
//! Only sampling performs I/O. Signal extraction is CPU-bound and runs on a
//! blocking thread with rayon parallelism inside each stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use adscore_models::{
    round3, Interpretation, KeyMoment, PacingParams, ReportDocument, ScoreReport,
};
use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn, Instrument};

use crate::attention::fusion::{FusionEngine, FusionInputs, SemanticSeries};
use crate::attention::interpreter::interpret;
use crate::attention::motion::MotionEstimator;
use crate::attention::pacing::PacingScorer;
use crate::attention::profiles::AgeGroupTable;
use crate::attention::saliency::SaliencyExtractor;
use crate::attention::scene_change::{FrameEmbedder, SceneChangeDetector, SceneChangeSeries};
use crate::config::AnalysisConfig;
use crate::error::{ensure_len, MediaError, MediaResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::sampler::{FrameSampler, VideoSample};

/// Failure of an external semantic scorer.
#[derive(Debug, Error)]
#[error("Semantic scoring failed: {0}")]
pub struct SemanticError(pub String);

/// Prompt-similarity scorer producing one value per frame.
pub trait SemanticScorer: Send + Sync {
    fn name(&self) -> &str;

    fn score_frames(&self, frames: &[RgbImage]) -> Result<Vec<f64>, SemanticError>;
}

/// Precomputed per-frame signals, all aligned to the same N frames.
#[derive(Debug, Clone)]
pub struct SignalSet {
    pub timestamps: Vec<f64>,
    pub sampling_fps: f64,
    pub saliency: Vec<f64>,
    pub motion: Vec<f64>,
    pub scene: SceneChangeSeries,
    pub semantic: SemanticSeries,
    pub degraded_saliency_frames: usize,
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: ScoreReport,
    pub interpretation: Interpretation,
    /// Fused attention per frame
    pub curve: Vec<f64>,
    pub timestamps: Vec<f64>,
    pub saliency: Vec<f64>,
    pub motion: Vec<f64>,
    pub pacing: Vec<f64>,
    pub scene: SceneChangeSeries,
}

impl AnalysisOutcome {
    /// Report and interpretation as one JSON document.
    pub fn document(&self) -> ReportDocument {
        ReportDocument {
            report: self.report.clone(),
            interpretation: self.interpretation.clone(),
        }
    }
}

/// Attention and pacing scoring engine.
#[derive(Clone)]
pub struct AttentionEngine {
    config: AnalysisConfig,
    profiles: Arc<AgeGroupTable>,
    embedder: Option<Arc<dyn FrameEmbedder>>,
    semantic: Option<Arc<dyn SemanticScorer>>,
}

impl std::fmt::Debug for AttentionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttentionEngine")
            .field("config", &self.config)
            .field("embedder", &self.embedder.as_ref().map(|e| e.name().to_string()))
            .field("semantic", &self.semantic.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

impl AttentionEngine {
    pub fn new(config: AnalysisConfig, profiles: Arc<AgeGroupTable>) -> Self {
        Self {
            config,
            profiles,
            embedder: None,
            semantic: None,
        }
    }

    /// Embedding model for [`adscore_models::SceneChangeMethod::Embedding`].
    pub fn with_embedder(mut self, embedder: Arc<dyn FrameEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Optional semantic scorer; without one the semantic signal is absent.
    pub fn with_semantic_scorer(mut self, scorer: Arc<dyn SemanticScorer>) -> Self {
        self.semantic = Some(scorer);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Sample and score a video file.
    pub async fn analyze_file(&self, path: impl AsRef<Path>) -> MediaResult<AnalysisOutcome> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let logger = RunLogger::for_path(&path);
        let span = logger.create_span();

        async move {
            let started = Instant::now();
            logger.log_start(&format!(
                "goal={} age_group={} fps={}",
                self.config.goal,
                self.config.age_group,
                self.config.effective_fps()
            ));

            let sampler = FrameSampler::new(self.config.sampling_fps)
                .with_analysis_width(self.config.analysis_width)
                .with_max_frames(self.config.max_frames);
            let sample = sampler.sample(&path).await?;
            logger.log_stage(
                "sampling",
                &format!("{} frames, step {}", sample.len(), sample.step),
            );

            let engine = self.clone();
            let outcome = tokio::task::spawn_blocking(move || engine.score_sample(&sample))
                .await
                .map_err(|e| MediaError::TaskFailed(format!("Blocking task join error: {}", e)))??;

            if outcome.report.degraded_saliency_frames > 0 {
                logger.log_warning(&format!(
                    "{} frames used the zero saliency map",
                    outcome.report.degraded_saliency_frames
                ));
            }
            metrics::record_analysis(
                self.config.goal.as_str(),
                self.config.age_group.as_str(),
                outcome.report.overall_attention_score,
                started.elapsed().as_secs_f64(),
            );
            logger.log_completion(&format!(
                "overall={:.3} grade={}",
                outcome.report.overall_attention_score, outcome.interpretation.grade
            ));
            Ok::<_, MediaError>(outcome)
        }
        .instrument(span)
        .await
    }

    /// Extract signals from sampled frames and score them.
    pub fn score_sample(&self, sample: &VideoSample) -> MediaResult<AnalysisOutcome> {
        ensure_len("timestamps", sample.frames.len(), sample.timestamps.len())?;

        let saliency = SaliencyExtractor::new(self.config.center_bias).score_frames(&sample.frames);
        metrics::record_degraded_saliency(saliency.degraded_frames);
        info!(
            frames = saliency.scores.len(),
            degraded = saliency.degraded_frames,
            center_bias = self.config.center_bias,
            "Saliency complete"
        );

        let motion = MotionEstimator::default().score_frames(&sample.frames);
        info!(frames = motion.len(), "Motion complete");

        let mut detector =
            SceneChangeDetector::new(self.config.scene_method, self.config.threshold_mode)
                .with_window_secs(self.config.cut_window_secs);
        if let Some(embedder) = &self.embedder {
            detector = detector.with_embedder(embedder.clone());
        }
        // Cut rate is per second of video, so it follows the rate kept frames
        // actually occur at rather than the requested one.
        let scene = detector.analyze(&sample.frames, sample.effective_fps());

        let semantic = match &self.semantic {
            None => SemanticSeries::Absent,
            Some(scorer) => match scorer.score_frames(&sample.frames) {
                Ok(values) if values.len() == sample.frames.len() => SemanticSeries::Present(values),
                Ok(values) => {
                    warn!(
                        scorer = scorer.name(),
                        expected = sample.frames.len(),
                        actual = values.len(),
                        "Semantic series length mismatch, scoring without it"
                    );
                    SemanticSeries::Absent
                }
                Err(e) => {
                    warn!(scorer = scorer.name(), error = %e, "Semantic scoring unavailable");
                    SemanticSeries::Absent
                }
            },
        };

        self.score_signals(SignalSet {
            timestamps: sample.timestamps.clone(),
            sampling_fps: sample.sampling_fps,
            saliency: saliency.scores,
            motion,
            scene,
            semantic,
            degraded_saliency_frames: saliency.degraded_frames,
        })
    }

    /// Score precomputed signals: pacing, fusion, report and interpretation.
    pub fn score_signals(&self, signals: SignalSet) -> MediaResult<AnalysisOutcome> {
        let n = signals.saliency.len();
        if n == 0 {
            return Err(MediaError::invalid_length("saliency", 1, 0));
        }
        ensure_len("timestamps", n, signals.timestamps.len())?;
        ensure_len("motion", n, signals.motion.len())?;
        ensure_len("cut_rate", n, signals.scene.cut_rate.len())?;

        let profile = self.profiles.get(self.config.age_group);
        let pacing_scorer = PacingScorer::for_goal(
            profile,
            self.config.goal,
            self.config.f_star,
            self.config.lambda,
        );
        let pacing = pacing_scorer.score(&signals.scene.cut_rate);

        let fusion = FusionEngine::from_profile(profile).fuse(FusionInputs {
            saliency: &signals.saliency,
            motion: &signals.motion,
            semantic: &signals.semantic,
            pacing: Some(&pacing),
        })?;

        let avg_cut_rate = signals.scene.average_cut_rate();
        let params = pacing_scorer.params();
        let interpretation = interpret(
            fusion.overall,
            fusion.first_5s,
            avg_cut_rate,
            self.config.goal,
            params.f_star,
            Some(profile),
        );

        let key_moments = fusion
            .key_moments
            .iter()
            .map(|(i, score)| KeyMoment {
                time: round3(signals.timestamps[*i]),
                score: round3(*score),
            })
            .collect();

        let report = ScoreReport {
            overall_attention_score: round3(fusion.overall),
            first_5s_retention: round3(fusion.first_5s),
            avg_cut_rate: round3(avg_cut_rate),
            goal: self.config.goal,
            age_group: self.config.age_group,
            pacing: PacingParams {
                f_star: params.f_star,
                lambda: params.lambda,
            },
            key_moments,
            frames_analyzed: n,
            sampling_fps: signals.sampling_fps,
            scene_method: self.config.scene_method,
            scene_feature_fallback: signals.scene.feature_fallback,
            used_semantic_scoring: signals.semantic.is_present(),
            degraded_saliency_frames: signals.degraded_saliency_frames,
        };

        info!(
            overall = report.overall_attention_score,
            first_5s = report.first_5s_retention,
            avg_cut_rate = report.avg_cut_rate,
            grade = %interpretation.grade,
            "Scoring complete"
        );

        Ok(AnalysisOutcome {
            report,
            interpretation,
            curve: fusion.curve,
            timestamps: signals.timestamps,
            saliency: signals.saliency,
            motion: signals.motion,
            pacing,
            scene: signals.scene,
        })
    }
}
