//! Attention and pacing scoring binary.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adscore_media::{AgeGroupTable, AnalysisConfig, AttentionEngine};
use adscore_models::{AgeGroup, CreativeGoal, ReportDocument, SceneChangeMethod, ThresholdMode};

/// Score a video ad for attention and goal-specific pacing.
///
/// Flags override `ADSCORE_*` environment variables.
#[derive(Debug, Parser)]
#[command(name = "adscore", version, about)]
struct Args {
    /// Video file to analyse
    video: PathBuf,

    /// Frames sampled per second (clamped to 1-6)
    #[arg(long)]
    fps: Option<f64>,

    /// Creative goal: hook, explainer or calm_brand
    #[arg(long)]
    goal: Option<CreativeGoal>,

    /// Audience profile key; unknown keys use the general profile
    #[arg(long, value_parser = parse_age_group)]
    age_group: Option<AgeGroup>,

    /// Scene-change feature: histogram or embedding
    #[arg(long)]
    scene_method: Option<SceneChangeMethod>,

    /// Cut threshold rule: zscore or percentile
    #[arg(long)]
    threshold_mode: Option<ThresholdMode>,

    /// Cut-rate window in seconds
    #[arg(long)]
    cut_window: Option<f64>,

    /// Override the pacing sensitivity
    #[arg(long)]
    lambda: Option<f64>,

    /// Override the target cut rate (cuts per second)
    #[arg(long)]
    f_star: Option<f64>,

    /// Score saliency by the 95th percentile instead of centre overlap
    #[arg(long)]
    no_center_bias: bool,

    /// Stop after this many sampled frames
    #[arg(long)]
    max_frames: Option<usize>,

    /// Also write the JSON report to this path
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Emit compact instead of pretty JSON
    #[arg(long)]
    compact: bool,
}

fn parse_age_group(value: &str) -> Result<AgeGroup, Infallible> {
    Ok(AgeGroup::from_key(value))
}

impl Args {
    /// Apply flags on top of an env-derived config.
    fn apply(&self, mut config: AnalysisConfig) -> AnalysisConfig {
        if let Some(fps) = self.fps {
            config.sampling_fps = fps;
        }
        if let Some(goal) = self.goal {
            config.goal = goal;
        }
        if let Some(age_group) = self.age_group {
            config.age_group = age_group;
        }
        if let Some(method) = self.scene_method {
            config.scene_method = method;
        }
        if let Some(mode) = self.threshold_mode {
            config.threshold_mode = mode;
        }
        if let Some(window) = self.cut_window.filter(|w| w.is_finite() && *w > 0.0) {
            config.cut_window_secs = window;
        }
        if self.lambda.is_some() {
            config.lambda = self.lambda;
        }
        if self.f_star.is_some() {
            config.f_star = self.f_star;
        }
        if self.no_center_bias {
            config.center_bias = false;
        }
        if let Some(max) = self.max_frames.filter(|n| *n > 0) {
            config.max_frames = Some(max);
        }
        config
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    for directive in ["adscore=info", "adscore_media=info"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    // Logs go to stderr so stdout carries only the report.
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn render(document: &ReportDocument, compact: bool) -> anyhow::Result<String> {
    let json = if compact {
        serde_json::to_string(document)?
    } else {
        serde_json::to_string_pretty(document)?
    };
    Ok(json)
}

async fn write_report(path: &Path, json: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing report to {}", path.display()))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.apply(AnalysisConfig::from_env());
    info!("Analysis config: {:?}", config);

    let engine = AttentionEngine::new(config, Arc::new(AgeGroupTable::builtin()));
    let outcome = engine
        .analyze_file(&args.video)
        .await
        .with_context(|| format!("analysing {}", args.video.display()))?;

    let json = render(&outcome.document(), args.compact)?;
    if let Some(out) = &args.out {
        write_report(out, &json).await?;
        info!(path = %out.display(), "Report written");
    }
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    info!("Starting adscore");

    if let Err(e) = run(args).await {
        error!("Analysis failed: {:#}", e);
        std::process::exit(1);
    }
}
