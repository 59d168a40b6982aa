//! Structured run logging.
//!
//! Provides consistent, structured logging for one analysis run with a
//! tracing span and the run's identifying fields.

use std::path::Path;
use tracing::{info, warn, Span};

/// Run logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    source: String,
}

impl RunLogger {
    /// Create a logger for a video file.
    pub fn for_path(path: &Path) -> Self {
        let source = path.display().to_string();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        Self {
            run_id: format!("{}-{}", stem, std::process::id()),
            source,
        }
    }

    /// Create a logger for in-memory input.
    pub fn from_string(run_id: &str, source: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            source: source.to_string(),
        }
    }

    /// Log the start of a run.
    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, source = %self.source, "Analysis started: {}", message);
    }

    /// Log the completion of a stage.
    pub fn log_stage(&self, stage: &str, message: &str) {
        info!(
            run_id = %self.run_id,
            stage = stage,
            "Stage complete: {}", message
        );
    }

    /// Log a degradation that does not abort the run.
    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, source = %self.source, "Analysis warning: {}", message);
    }

    /// Log the completion of a run.
    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, source = %self.source, "Analysis completed: {}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Create a tracing span for this run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("analysis", run_id = %self.run_id, source = %self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_for_path() {
        let logger = RunLogger::for_path(Path::new("/ads/summer_spot.mp4"));
        assert!(logger.run_id().starts_with("summer_spot-"));
        assert_eq!(logger.source(), "/ads/summer_spot.mp4");
    }

    #[test]
    fn test_run_logger_from_string() {
        let logger = RunLogger::from_string("signals-1", "memory");
        assert_eq!(logger.run_id(), "signals-1");
        assert_eq!(logger.source(), "memory");
    }
}
