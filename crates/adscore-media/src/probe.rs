//! FFprobe stream information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when the container does not report one.
pub const DEFAULT_NATIVE_FPS: f64 = 30.0;

/// Video stream information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds (0 when unknown)
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Native frame rate
    pub fps: f64,
    /// Codec name reported by the container
    pub codec: String,
    /// Frame count when the container records one
    pub frame_count: Option<u64>,
    /// Display rotation in degrees, one of 0, 90, 180 or 270
    #[serde(default)]
    pub rotation: u32,
}

impl VideoInfo {
    /// Width and height as displayed. FFmpeg applies the rotation while
    /// decoding, so decoded frames have these dimensions.
    pub fn display_dimensions(&self) -> (u32, u32) {
        if self.rotation % 180 == 90 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// Fields requested from ffprobe; everything else is left out of the JSON.
const SHOW_ENTRIES: &str = "format=duration\
    :stream=codec_name,width,height,avg_frame_rate,r_frame_rate,nb_frames,duration\
    :stream_tags=rotate:stream_side_data=rotation";

#[derive(Debug, Deserialize)]
struct ProbeDocument {
    #[serde(default)]
    format: Option<ContainerEntry>,
    #[serde(default)]
    streams: Vec<StreamEntry>,
}

#[derive(Debug, Deserialize)]
struct ContainerEntry {
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StreamEntry {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    side_data_list: Vec<SideData>,
    tags: StreamTags,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SideData {
    rotation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StreamTags {
    rotate: Option<String>,
}

impl StreamEntry {
    /// Display-matrix rotation, else the legacy `rotate` tag.
    fn rotation(&self) -> u32 {
        self.side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| self.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
            .map(normalize_rotation)
            .unwrap_or(0)
    }
}

/// Snap degrees to the nearest quarter turn in `0..360`.
fn normalize_rotation(degrees: f64) -> u32 {
    if !degrees.is_finite() {
        return 0;
    }
    let quarters = (degrees / 90.0).round() as i64;
    (quarters.rem_euclid(4) * 90) as u32
}

fn seconds(value: Option<&String>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Probe the first video stream of a file.
///
/// Every failure is reported as [`MediaError::VideoOpen`] except a missing
/// `ffprobe` binary.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(MediaError::video_open(path, "file does not exist"));
    }
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let mut cmd = Command::new("ffprobe");
    cmd.args(["-v", "error", "-select_streams", "v:0", "-of", "json"])
        .args(["-show_entries", SHOW_ENTRIES])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd
        .output()
        .await
        .map_err(|e| MediaError::video_open(path, format!("failed to run ffprobe: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::video_open(
            path,
            format!("ffprobe exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    let info = parse_probe_output(&output.stdout)
        .map_err(|message| MediaError::video_open(path, message))?;
    debug!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        fps = info.fps,
        frames = ?info.frame_count,
        rotation = info.rotation,
        "Probed video"
    );
    Ok(info)
}

fn parse_probe_output(stdout: &[u8]) -> Result<VideoInfo, String> {
    let doc: ProbeDocument =
        serde_json::from_slice(stdout).map_err(|e| format!("unreadable ffprobe output: {e}"))?;
    let stream = doc
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream found".to_string())?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no dimensions".to_string()),
    };

    let fps = [&stream.avg_frame_rate, &stream.r_frame_rate]
        .into_iter()
        .find_map(|rate| rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(DEFAULT_NATIVE_FPS);

    let duration = seconds(doc.format.as_ref().and_then(|f| f.duration.as_ref()))
        .or_else(|| seconds(stream.duration.as_ref()))
        .unwrap_or(0.0);

    let rotation = stream.rotation();
    Ok(VideoInfo {
        duration,
        width,
        height,
        fps,
        codec: stream.codec_name.unwrap_or_default(),
        frame_count: stream.nb_frames.and_then(|n| n.trim().parse().ok()),
        rotation,
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97"). Zero rates are `None`.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        s.trim().parse().ok()?
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rate_forms() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate(" 24 "), Some(24.0));
        let ntsc = parse_frame_rate("24000/1001").unwrap();
        assert!((ntsc - 23.976).abs() < 1e-3);
        assert!(parse_frame_rate("0/0").is_none());
        assert!(parse_frame_rate("0").is_none());
    }

    #[test]
    fn test_unknown_rate_uses_default() {
        let json = br#"{
            "format": {"duration": "12.5"},
            "streams": [
                {"codec_name": "h264", "width": 1080, "height": 1920,
                 "avg_frame_rate": "0/0", "r_frame_rate": "0/0", "nb_frames": "300"}
            ]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.fps, DEFAULT_NATIVE_FPS);
        assert_eq!((info.width, info.height), (1080, 1920));
        assert_eq!(info.frame_count, Some(300));
        assert!((info.duration - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = br#"{"format": {"duration": "N/A"},
            "streams": [{"width": 640, "height": 360, "r_frame_rate": "30/1", "duration": "4.0"}]}"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.fps, 30.0);
        assert_eq!(info.duration, 4.0);
        assert_eq!(info.frame_count, None);
    }

    #[test]
    fn test_rejects_missing_stream_or_dimensions() {
        assert_eq!(
            parse_probe_output(br#"{"streams": []}"#).unwrap_err(),
            "no video stream found"
        );
        assert!(parse_probe_output(br#"{"streams": [{"codec_name": "png"}]}"#).is_err());
        assert!(parse_probe_output(b"not json").is_err());
    }

    #[test]
    fn test_display_matrix_rotation_swaps_dimensions() {
        let json = br#"{"streams": [{"width": 1920, "height": 1080, "r_frame_rate": "30/1",
            "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]}]}"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.rotation, 270);
        assert_eq!((info.width, info.height), (1920, 1080));
        assert_eq!(info.display_dimensions(), (1080, 1920));
    }

    #[test]
    fn test_rotate_tag_fallback() {
        let json = br#"{"streams": [{"width": 640, "height": 360, "tags": {"rotate": "90"}}]}"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.rotation, 90);
        assert_eq!(info.display_dimensions(), (360, 640));

        let json = br#"{"streams": [{"width": 640, "height": 360, "tags": {"rotate": "180"}}]}"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.rotation, 180);
        assert_eq!(info.display_dimensions(), (640, 360));
    }

    #[test]
    fn test_side_data_wins_over_tag() {
        let json = br#"{"streams": [{"width": 640, "height": 360,
            "side_data_list": [{"side_data_type": "CPB properties"}, {"rotation": 180}],
            "tags": {"rotate": "90"}}]}"#;
        assert_eq!(parse_probe_output(json).unwrap().rotation, 180);
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0.0), 0);
        assert_eq!(normalize_rotation(-90.0), 270);
        assert_eq!(normalize_rotation(90.00000000000001), 90);
        assert_eq!(normalize_rotation(-180.0), 180);
        assert_eq!(normalize_rotation(450.0), 90);
        assert_eq!(normalize_rotation(f64::NAN), 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_video_open() {
        let err = probe_video("/nonexistent/ad.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::VideoOpen { .. }));
    }
}
