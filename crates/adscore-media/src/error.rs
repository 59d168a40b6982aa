//! Error types for media and scoring operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while sampling and scoring a video.
///
/// Only [`MediaError::VideoOpen`] and [`MediaError::NoFramesExtracted`] are
/// expected in correct use. [`MediaError::InvalidSeriesLength`] signals a
/// contract violation between stages.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Cannot open video {path}: {message}")]
    VideoOpen { path: PathBuf, message: String },

    #[error("No frames extracted from {0}")]
    NoFramesExtracted(PathBuf),

    #[error("Series '{series}' has length {actual}, expected {expected}")]
    InvalidSeriesLength {
        series: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Timestamp {index} is earlier than the one before it")]
    NonMonotonicTimestamps { index: usize },

    #[error("Analysis task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a video open error.
    pub fn video_open(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VideoOpen {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a series length mismatch error.
    pub fn invalid_length(series: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidSeriesLength {
            series,
            expected,
            actual,
        }
    }

    /// Whether the error aborts a run because the source is unusable.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::VideoOpen { .. }
                | Self::NoFramesExtracted(_)
                | Self::FfmpegNotFound
                | Self::FfprobeNotFound
        )
    }
}

/// Ensure a stage input has the expected length.
pub fn ensure_len(series: &'static str, expected: usize, actual: usize) -> MediaResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(MediaError::invalid_length(series, expected, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_len() {
        assert!(ensure_len("saliency", 3, 3).is_ok());
        let err = ensure_len("motion", 3, 2).unwrap_err();
        assert!(matches!(
            err,
            MediaError::InvalidSeriesLength {
                series: "motion",
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = MediaError::video_open("/tmp/a.mp4", "no video stream");
        assert_eq!(err.to_string(), "Cannot open video /tmp/a.mp4: no video stream");
        assert!(err.is_source_error());
        assert!(!MediaError::invalid_length("pacing", 1, 0).is_source_error());
        let err = MediaError::NonMonotonicTimestamps { index: 2 };
        assert_eq!(err.to_string(), "Timestamp 2 is earlier than the one before it");
        assert!(!err.is_source_error());
    }
}
