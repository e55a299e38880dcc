//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{DetectError, DetectResult};

/// Video stream information needed for sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds (0 when unknown)
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Native frame rate; 0 when the container does not report one
    pub fps: f64,
    /// Total frame count, best-effort
    pub frame_count: Option<u64>,
    /// Video codec
    pub codec: String,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// Probe a video file.
///
/// Any failure to read the container is reported as `UnreadableSource`;
/// a missing `ffprobe` binary is a processing error.
pub fn probe_video(path: impl AsRef<Path>) -> DetectResult<VideoInfo> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(DetectError::unreadable(format!(
            "file not found: {}",
            path.display()
        )));
    }

    which::which("ffprobe").map_err(|_| DetectError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    if !output.status.success() {
        return Err(DetectError::unreadable(format!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe_output(&output.stdout)
}

/// Parse ffprobe JSON into `VideoInfo`.
fn parse_probe_output(stdout: &[u8]) -> DetectResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| DetectError::unreadable(format!("unparseable ffprobe output: {e}")))?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| DetectError::unreadable("no video stream found"))?;

    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(DetectError::unreadable("video stream has no dimensions"));
    }

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(0.0);

    let duration = stream
        .duration
        .as_deref()
        .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .or_else(|| {
            let estimate = (duration * fps).round();
            (estimate > 0.0).then_some(estimate as u64)
        });

    Ok(VideoInfo {
        duration,
        width,
        height,
        fps,
        frame_count,
        codec: stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
///
/// Returns `None` for zero or malformed rates such as "0/0".
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        s.parse().ok()?
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
        assert!(parse_frame_rate("garbage").is_none());
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 640, "height": 360,
                 "r_frame_rate": "30/1", "avg_frame_rate": "30/1", "nb_frames": "300"}
            ],
            "format": {"duration": "10.0"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.width, 640);
        assert_eq!(info.height, 360);
        assert_eq!(info.fps, 30.0);
        assert_eq!(info.frame_count, Some(300));
        assert_eq!(info.codec, "h264");
    }

    #[test]
    fn test_unknown_rate_and_estimated_count() {
        let json = br#"{
            "streams": [{"codec_type": "video", "width": 320, "height": 240,
                         "avg_frame_rate": "0/0", "r_frame_rate": "0/0"}],
            "format": {"duration": "4.0"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.fps, 0.0);
        assert_eq!(info.frame_count, None);

        let json = br#"{
            "streams": [{"codec_type": "video", "width": 320, "height": 240,
                         "avg_frame_rate": "25/1"}],
            "format": {"duration": "2.0"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.frame_count, Some(50));
    }

    #[test]
    fn test_no_video_stream_is_unreadable() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(DetectError::UnreadableSource(_))
        ));
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(DetectError::UnreadableSource(_))
        ));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = probe_video("/definitely/not/here.mp4").unwrap_err();
        assert!(matches!(err, DetectError::UnreadableSource(_)));
    }
}
