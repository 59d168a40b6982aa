//! Frame sampling through an FFmpeg rawvideo pipe.
//!
//! The video is decoded sequentially and scaled to the analysis width. Every
//! `step`-th decoded frame is kept, where
//! `step = max(1, floor(native_fps / target_fps))`, and stamped with
//! `decoded_index / native_fps`.

use image::RgbImage;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::probe::{probe_video, VideoInfo};

/// Lowest accepted sampling rate.
pub const MIN_SAMPLING_FPS: f64 = 1.0;
/// Highest accepted sampling rate.
pub const MAX_SAMPLING_FPS: f64 = 6.0;
/// Default analysis width in pixels.
pub const DEFAULT_ANALYSIS_WIDTH: u32 = 320;

/// Clamp a requested sampling rate into the supported range.
pub fn clamp_sampling_fps(fps: f64) -> f64 {
    if fps.is_finite() {
        fps.clamp(MIN_SAMPLING_FPS, MAX_SAMPLING_FPS)
    } else {
        MIN_SAMPLING_FPS
    }
}

/// Keep every `step`-th decoded frame.
pub fn frame_step(native_fps: f64, target_fps: f64) -> usize {
    if native_fps.is_finite() && target_fps > 0.0 {
        ((native_fps / target_fps).floor() as usize).max(1)
    } else {
        1
    }
}

/// Output height for `width` keeping aspect ratio, rounded to an even value.
pub fn scaled_height(width: u32, src_width: u32, src_height: u32) -> u32 {
    if src_width == 0 || src_height == 0 {
        return 0;
    }
    let half = (width as f64 * src_height as f64 / (src_width as f64 * 2.0)).round() as u32;
    (half * 2).max(2)
}

/// Frames sampled from one video.
#[derive(Debug, Clone)]
pub struct VideoSample {
    pub frames: Vec<RgbImage>,
    /// Seconds from the start, one per frame, non-decreasing
    pub timestamps: Vec<f64>,
    pub native_fps: f64,
    /// Requested rate after clamping
    pub sampling_fps: f64,
    pub step: usize,
}

impl VideoSample {
    /// Build a sample from already decoded frames.
    ///
    /// Rejects an empty sample, a timestamp count that differs from the frame
    /// count and timestamps that go backwards.
    pub fn new(
        frames: Vec<RgbImage>,
        timestamps: Vec<f64>,
        native_fps: f64,
        sampling_fps: f64,
    ) -> MediaResult<Self> {
        if frames.is_empty() {
            return Err(MediaError::invalid_length("frames", 1, 0));
        }
        crate::error::ensure_len("timestamps", frames.len(), timestamps.len())?;
        if let Some(pos) = timestamps
            .windows(2)
            .position(|w| w[1].partial_cmp(&w[0]).map_or(true, Ordering::is_lt))
        {
            return Err(MediaError::NonMonotonicTimestamps { index: pos + 1 });
        }
        let step = frame_step(native_fps, sampling_fps);
        Ok(Self {
            frames,
            timestamps,
            native_fps,
            sampling_fps,
            step,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Rate at which kept frames actually occur, `native_fps / step`.
    ///
    /// Differs from `sampling_fps` whenever the native rate is not a multiple
    /// of it (24 fps sampled at 5 gives step 4 and 6 frames per second).
    pub fn effective_fps(&self) -> f64 {
        let fps = self.native_fps / self.step.max(1) as f64;
        if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            self.sampling_fps
        }
    }
}

/// Geometry of an rgb24 rawvideo stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
}

impl FrameLayout {
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Frames kept from a rawvideo stream.
#[derive(Debug, Default)]
pub(crate) struct DecodedFrames {
    pub frames: Vec<RgbImage>,
    pub timestamps: Vec<f64>,
    /// Whole frames read from the stream, kept or not
    pub decoded: usize,
    /// Reading stopped at `max_frames` before the stream ended
    pub capped: bool,
}

/// Read rgb24 frames from `reader`, keeping every `step`-th one.
///
/// A kept frame is stamped `decoded_index / native_fps`. A truncated final
/// frame is dropped.
pub(crate) async fn read_frames<R>(
    reader: R,
    layout: FrameLayout,
    step: usize,
    native_fps: f64,
    max_frames: Option<usize>,
) -> std::io::Result<DecodedFrames>
where
    R: AsyncRead + Unpin,
{
    let bytes_per_frame = layout.frame_bytes();
    let step = step.max(1);
    let mut out = DecodedFrames::default();
    if bytes_per_frame == 0 {
        return Ok(out);
    }

    let mut reader = BufReader::with_capacity(bytes_per_frame, reader);
    let mut buffer = vec![0u8; bytes_per_frame];
    loop {
        match reader.read_exact(&mut buffer).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }

        let index = out.decoded;
        out.decoded += 1;
        if index % step != 0 {
            continue;
        }

        let frame = RgbImage::from_raw(layout.width, layout.height, buffer.clone()).ok_or_else(
            || std::io::Error::new(std::io::ErrorKind::InvalidData, "frame buffer size mismatch"),
        )?;
        out.frames.push(frame);
        out.timestamps.push(index as f64 / native_fps);

        if max_frames.is_some_and(|max| out.frames.len() >= max) {
            out.capped = true;
            break;
        }
    }
    Ok(out)
}

/// Number of trailing FFmpeg stderr lines kept in error messages.
const STDERR_TAIL_LINES: usize = 5;

/// Last non-empty lines of FFmpeg's stderr, joined with "; ".
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("; ")
}

/// Error for a decode that kept no frames.
///
/// A failed FFmpeg run means the source could not be decoded at all; a clean
/// exit with no output means the stream simply had no frames.
fn empty_decode_error(
    path: &Path,
    exit_ok: bool,
    code: Option<i32>,
    stderr: &[u8],
) -> MediaError {
    if exit_ok {
        return MediaError::NoFramesExtracted(PathBuf::from(path));
    }
    let status = code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"));
    let tail = stderr_tail(stderr);
    let message = if tail.is_empty() {
        format!("ffmpeg exited with {status}")
    } else {
        format!("ffmpeg exited with {status}: {tail}")
    };
    MediaError::video_open(path, message)
}

/// Samples frames from a video file.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    target_fps: f64,
    analysis_width: u32,
    max_frames: Option<usize>,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl FrameSampler {
    pub fn new(target_fps: f64) -> Self {
        Self {
            target_fps: clamp_sampling_fps(target_fps),
            analysis_width: DEFAULT_ANALYSIS_WIDTH,
            max_frames: None,
        }
    }

    pub fn with_analysis_width(mut self, width: u32) -> Self {
        self.analysis_width = width.max(16);
        self
    }

    /// Stop after this many kept frames.
    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames.filter(|n| *n > 0);
        self
    }

    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    /// Probe and decode `path`.
    pub async fn sample(&self, path: impl AsRef<Path>) -> MediaResult<VideoSample> {
        let path = path.as_ref();
        let info = probe_video(path).await?;
        self.sample_with_info(path, &info).await
    }

    async fn sample_with_info(&self, path: &Path, info: &VideoInfo) -> MediaResult<VideoSample> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        // FFmpeg autorotates, so the scale target follows the display size.
        let (display_width, display_height) = info.display_dimensions();
        let width = self.analysis_width;
        let height = scaled_height(width, display_width, display_height);
        if height == 0 {
            return Err(MediaError::video_open(path, "unknown frame size"));
        }
        let layout = FrameLayout { width, height };
        let step = frame_step(info.fps, self.target_fps);

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin", "-i"])
            .arg(path)
            .args([
                "-vf",
                &format!("scale={}:{}", width, height),
                "-pix_fmt",
                "rgb24",
                "-f",
                "rawvideo",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            path = %path.display(),
            width,
            height,
            step,
            native_fps = info.fps,
            rotation = info.rotation,
            "Starting frame decode"
        );

        let mut child = cmd
            .spawn()
            .map_err(|e| MediaError::video_open(path, format!("failed to spawn ffmpeg: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::video_open(path, "failed to capture ffmpeg stdout"))?;
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                buf
            })
        });

        let decoded = match read_frames(stdout, layout, step, info.fps, self.max_frames).await {
            Ok(decoded) => decoded,
            Err(e) => {
                let _ = child.kill().await;
                return Err(MediaError::Io(e));
            }
        };

        if decoded.capped {
            // Remaining output is not needed.
            let _ = child.kill().await;
            if let Some(task) = stderr_task {
                task.abort();
            }
        } else {
            let status = child.wait().await?;
            let stderr = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => Vec::new(),
            };
            if decoded.frames.is_empty() {
                return Err(empty_decode_error(
                    path,
                    status.success(),
                    status.code(),
                    &stderr,
                ));
            }
            if !status.success() {
                warn!(
                    path = %path.display(),
                    code = ?status.code(),
                    stderr = %stderr_tail(&stderr),
                    "FFmpeg exited with non-zero status"
                );
            }
        }

        metrics::record_frames_sampled(decoded.frames.len());
        info!(
            path = %path.display(),
            frames = decoded.frames.len(),
            decoded = decoded.decoded,
            step,
            sampling_fps = self.target_fps,
            "Sampled video frames"
        );

        VideoSample::new(decoded.frames, decoded.timestamps, info.fps, self.target_fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_step() {
        assert_eq!(frame_step(30.0, 2.0), 15);
        assert_eq!(frame_step(29.97, 2.0), 14);
        assert_eq!(frame_step(24.0, 5.0), 4);
        assert_eq!(frame_step(1.0, 6.0), 1);
    }

    #[test]
    fn test_clamp_sampling_fps() {
        assert_eq!(clamp_sampling_fps(0.5), 1.0);
        assert_eq!(clamp_sampling_fps(10.0), 6.0);
        assert_eq!(clamp_sampling_fps(2.0), 2.0);
        assert_eq!(clamp_sampling_fps(f64::NAN), 1.0);
    }

    #[test]
    fn test_scaled_height_even() {
        assert_eq!(scaled_height(320, 1920, 1080), 180);
        assert_eq!(scaled_height(320, 1080, 1920), 568);
        assert_eq!(scaled_height(320, 0, 1080), 0);
        assert_eq!(scaled_height(320, 100, 75) % 2, 0);
    }

    #[test]
    fn test_video_sample_length_check() {
        let frames = vec![RgbImage::new(4, 4); 2];
        assert!(VideoSample::new(frames.clone(), vec![0.0], 30.0, 2.0).is_err());
        let sample = VideoSample::new(frames, vec![0.0, 0.5], 30.0, 2.0).unwrap();
        assert_eq!(sample.step, 15);
        assert_eq!(sample.len(), 2);
    }

    #[test]
    fn test_video_sample_rejects_empty() {
        let err = VideoSample::new(Vec::new(), Vec::new(), 30.0, 2.0).unwrap_err();
        assert!(matches!(
            err,
            MediaError::InvalidSeriesLength {
                series: "frames",
                actual: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_video_sample_rejects_decreasing_timestamps() {
        let frames = vec![RgbImage::new(4, 4); 3];
        let err = VideoSample::new(frames.clone(), vec![0.0, 0.5, 0.4], 30.0, 2.0).unwrap_err();
        assert!(matches!(err, MediaError::NonMonotonicTimestamps { index: 2 }));

        let timestamps = vec![0.0, f64::NAN, 1.0];
        let err = VideoSample::new(frames.clone(), timestamps, 30.0, 2.0).unwrap_err();
        assert!(matches!(err, MediaError::NonMonotonicTimestamps { index: 1 }));

        // Repeated timestamps are allowed.
        assert!(VideoSample::new(frames, vec![0.0, 0.5, 0.5], 30.0, 2.0).is_ok());
    }

    #[test]
    fn test_effective_fps_follows_step() {
        let frames = vec![RgbImage::new(4, 4); 2];
        let sample = VideoSample::new(frames.clone(), vec![0.0, 0.25], 24.0, 5.0).unwrap();
        assert_eq!(sample.step, 4);
        assert_eq!(sample.effective_fps(), 6.0);

        let sample = VideoSample::new(frames, vec![0.0, 0.5], 30.0, 2.0).unwrap();
        assert_eq!(sample.effective_fps(), 2.0);
    }

    /// `count` 2x1 frames whose bytes are all the frame index.
    fn raw_frames(count: u8) -> Vec<u8> {
        (0..count).flat_map(|i| vec![i; 6]).collect()
    }

    const TINY: FrameLayout = FrameLayout {
        width: 2,
        height: 1,
    };

    #[tokio::test]
    async fn test_read_frames_keeps_every_step() {
        let raw = raw_frames(7);
        // Chunk boundaries fall inside frames.
        let reader = tokio_test::io::Builder::new()
            .read(&raw[..4])
            .read(&raw[4..17])
            .read(&raw[17..])
            .build();

        let out = read_frames(reader, TINY, 3, 30.0, None).await.unwrap();
        assert_eq!(out.decoded, 7);
        assert!(!out.capped);
        let firsts: Vec<u8> = out.frames.iter().map(|f| f.as_raw()[0]).collect();
        assert_eq!(firsts, vec![0, 3, 6]);
        assert_eq!(out.timestamps, vec![0.0, 0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_read_frames_stops_at_cap() {
        let raw = raw_frames(10);
        let out = read_frames(&raw[..], TINY, 2, 10.0, Some(3)).await.unwrap();
        assert!(out.capped);
        assert_eq!(out.frames.len(), 3);
        assert_eq!(out.decoded, 5);
        assert_eq!(out.timestamps, vec![0.0, 0.2, 0.4]);
    }

    #[tokio::test]
    async fn test_read_frames_drops_truncated_tail() {
        let mut raw = raw_frames(3);
        raw.extend_from_slice(&[9, 9, 9, 9]);
        let reader = tokio_test::io::Builder::new().read(&raw).build();

        let out = read_frames(reader, TINY, 1, 25.0, None).await.unwrap();
        assert_eq!(out.frames.len(), 3);
        assert_eq!(out.decoded, 3);
        assert!(out.frames.iter().all(|f| f.as_raw().len() == 6));
        assert_eq!(out.timestamps, vec![0.0, 0.04, 0.08]);
    }

    #[tokio::test]
    async fn test_read_frames_empty_stream() {
        let out = read_frames(&b""[..], TINY, 1, 30.0, Some(4)).await.unwrap();
        assert!(out.frames.is_empty());
        assert_eq!(out.decoded, 0);
        assert!(!out.capped);
    }

    #[tokio::test]
    async fn test_read_frames_propagates_read_error() {
        let raw = raw_frames(1);
        let reader = tokio_test::io::Builder::new()
            .read(&raw)
            .read_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
            .build();
        let err = read_frames(reader, TINY, 1, 30.0, None).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = b"a\n\nb\nc\nd\ne\nf\n  g  \n";
        assert_eq!(stderr_tail(stderr), "c; d; e; f; g");
        assert_eq!(stderr_tail(b""), "");
    }

    #[test]
    fn test_failed_decode_is_video_open_with_stderr() {
        let stderr =
            b"[mov,mp4] moov atom not found\nspot.mp4: Invalid data found when processing input\n";
        let err = empty_decode_error(Path::new("spot.mp4"), false, Some(1), stderr);
        match err {
            MediaError::VideoOpen { path, message } => {
                assert_eq!(path, PathBuf::from("spot.mp4"));
                assert!(message.starts_with("ffmpeg exited with status 1: "));
                assert!(message.ends_with("Invalid data found when processing input"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = empty_decode_error(Path::new("spot.mp4"), false, None, b"");
        assert_eq!(err.to_string(), "Cannot open video spot.mp4: ffmpeg exited with a signal");
    }

    #[test]
    fn test_clean_empty_decode_is_no_frames() {
        let err = empty_decode_error(Path::new("blank.mp4"), true, Some(0), b"");
        assert!(matches!(err, MediaError::NoFramesExtracted(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_video_open() {
        let err = FrameSampler::default()
            .sample("/nonexistent/spot.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::VideoOpen { .. }));
        assert!(err.is_source_error());
    }
}
