//! Video decoding backends.
//!
//! A [`VideoDecoder`] opens a source and hands out a [`VideoHandle`] that
//! yields decoded RGB frames in capture order. Dropping the handle releases
//! every decoder resource, so callers get cleanup on all exit paths for free.

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use image::RgbImage;
use tracing::{debug, warn};

use crate::error::{DetectError, DetectResult};
use crate::probe::{probe_video, VideoInfo};

/// An open, sequential decode session over one video.
pub trait VideoHandle: Send {
    /// Native frame rate; 0 when unknown.
    fn native_fps(&self) -> f64;

    /// Total frame count reported by the container, if any.
    fn frame_count(&self) -> Option<u64>;

    /// Frame dimensions (width, height).
    fn dimensions(&self) -> (u32, u32);

    /// Decode the next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> DetectResult<Option<RgbImage>>;
}

/// Opens video sources for decoding.
pub trait VideoDecoder: Send + Sync {
    /// Open `source`, failing with `UnreadableSource` if it cannot be decoded.
    fn open(&self, source: &Path) -> DetectResult<Box<dyn VideoHandle>>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Decoder that pipes raw RGB frames out of the `ffmpeg` CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegDecoder;

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn open(&self, source: &Path) -> DetectResult<Box<dyn VideoHandle>> {
        let info = probe_video(source)?;

        which::which("ffmpeg").map_err(|_| DetectError::FfmpegNotFound)?;

        // -noautorotate keeps output dimensions equal to the probed ones.
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
            .arg(source)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DetectError::processing("ffmpeg stdout not captured"))?;

        debug!(
            source = %source.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            frame_count = ?info.frame_count,
            codec = %info.codec,
            "Opened video for decoding"
        );

        Ok(Box::new(FfmpegHandle {
            frame_bytes: info.width as usize * info.height as usize * 3,
            info,
            child,
            stdout: BufReader::new(stdout),
            frames_read: 0,
            finished: false,
            source: source.to_path_buf(),
        }))
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Running `ffmpeg` process plus the stream metadata it was started with.
struct FfmpegHandle {
    info: VideoInfo,
    child: Child,
    stdout: BufReader<ChildStdout>,
    frame_bytes: usize,
    frames_read: u64,
    finished: bool,
    source: PathBuf,
}

impl FfmpegHandle {
    /// Reap the process once stdout is exhausted.
    fn finish(&mut self, partial_bytes: usize) -> DetectResult<Option<RgbImage>> {
        self.finished = true;
        let status = self.child.wait()?;

        if !status.success() {
            if self.frames_read == 0 {
                return Err(DetectError::unreadable(format!(
                    "ffmpeg could not decode {}: {}",
                    self.source.display(),
                    status
                )));
            }
            warn!(
                source = %self.source.display(),
                frames_read = self.frames_read,
                %status,
                "Decoder stopped early; treating as end of stream"
            );
        } else if partial_bytes > 0 {
            warn!(
                source = %self.source.display(),
                partial_bytes,
                "Discarding truncated trailing frame"
            );
        }

        Ok(None)
    }
}

impl VideoHandle for FfmpegHandle {
    fn native_fps(&self) -> f64 {
        self.info.fps
    }

    fn frame_count(&self) -> Option<u64> {
        self.info.frame_count
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn next_frame(&mut self) -> DetectResult<Option<RgbImage>> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.frame_bytes];
        let filled = read_full(&mut self.stdout, &mut buf)?;
        if filled < self.frame_bytes {
            return self.finish(filled);
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or_else(|| DetectError::processing("decoded frame has wrong size"))
    }
}

impl Drop for FfmpegHandle {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Read until `buf` is full or the reader hits EOF; returns bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_full_exact_and_short() {
        let mut reader = Cursor::new(vec![1u8; 10]);
        let mut buf = [0u8; 4];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 2);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_open_missing_file_is_unreadable() {
        let err = FfmpegDecoder::new()
            .open(Path::new("/no/such/video.mp4"))
            .err()
            .unwrap();
        assert!(matches!(err, DetectError::UnreadableSource(_)));
    }

    #[test]
    fn test_decoder_name() {
        assert_eq!(FfmpegDecoder::new().name(), "ffmpeg");
    }
}
