//! Fixed-rate frame sampling.
//!
//! The sampler walks every decoded frame of a video and keeps one out of
//! every `stride` frames, where `stride = floor(native_fps / target_fps)`.
//! When the container does not report a frame rate every frame is kept.

use std::path::Path;
use std::sync::Arc;

use image::RgbImage;
use tracing::{debug, info};

use crate::decoder::{VideoDecoder, VideoHandle};
use crate::error::DetectResult;

/// Default sampling rate in frames per second.
pub const DEFAULT_TARGET_FPS: f64 = 5.0;

/// A decoded frame retained by the sampler.
#[derive(Debug, Clone)]
pub struct Frame {
    /// 0-based index of the frame in the source stream
    pub index: u64,
    /// Decoded RGB raster at native resolution
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Compute the sampling stride for a native and target rate.
///
/// Unknown (zero) native rates and target rates above the native rate both
/// sample every frame.
pub fn compute_stride(native_fps: f64, target_fps: f64) -> u64 {
    if !(native_fps.is_finite() && native_fps > 0.0) {
        return 1;
    }
    if !(target_fps.is_finite() && target_fps > 0.0) {
        return 1;
    }
    ((native_fps / target_fps).floor() as u64).max(1)
}

/// Produces sampled frame sequences from video sources.
#[derive(Clone)]
pub struct FrameSampler {
    decoder: Arc<dyn VideoDecoder>,
    target_fps: f64,
}

impl FrameSampler {
    pub fn new(decoder: Arc<dyn VideoDecoder>, target_fps: f64) -> Self {
        Self {
            decoder,
            target_fps,
        }
    }

    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    pub fn decoder_name(&self) -> &'static str {
        self.decoder.name()
    }

    /// Open `source` and return a lazy sequence of sampled frames.
    ///
    /// Fails with `UnreadableSource` if the source cannot be opened. The
    /// returned iterator owns the decode handle and releases it when the
    /// stream ends, when decoding fails, or when the iterator is dropped.
    pub fn extract(&self, source: &Path) -> DetectResult<SampledFrames> {
        let handle = self.decoder.open(source)?;
        let native_fps = handle.native_fps();
        let stride = compute_stride(native_fps, self.target_fps);

        info!(
            source = %source.display(),
            native_fps,
            frame_count = ?handle.frame_count(),
            target_fps = self.target_fps,
            stride,
            "Sampling video"
        );

        Ok(SampledFrames {
            handle: Some(handle),
            stride,
            next_index: 0,
            retained: 0,
        })
    }
}

/// Lazy, finite, non-restartable sequence of sampled frames.
pub struct SampledFrames {
    handle: Option<Box<dyn VideoHandle>>,
    stride: u64,
    next_index: u64,
    retained: u64,
}

impl SampledFrames {
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Frames decoded so far, retained or not.
    pub fn frames_decoded(&self) -> u64 {
        self.next_index
    }

    /// Frames yielded so far.
    pub fn frames_retained(&self) -> u64 {
        self.retained
    }

    /// Whether the decode handle is still open.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn release(&mut self) {
        if self.handle.take().is_some() {
            debug!(
                decoded = self.next_index,
                retained = self.retained,
                "Released decode handle"
            );
        }
    }
}

impl Iterator for SampledFrames {
    type Item = DetectResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let handle = self.handle.as_mut()?;
            match handle.next_frame() {
                Ok(Some(image)) => {
                    let index = self.next_index;
                    self.next_index += 1;
                    if index % self.stride == 0 {
                        self.retained += 1;
                        return Some(Ok(Frame::new(index, image)));
                    }
                }
                Ok(None) => {
                    self.release();
                    return None;
                }
                Err(e) => {
                    self.release();
                    return Some(Err(e));
                }
            }
        }
    }
}
