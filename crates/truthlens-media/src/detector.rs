//! Face detector abstraction.

use image::RgbImage;

use crate::error::DetectResult;
use crate::models::FaceDetection;

/// Pluggable face detection backend.
///
/// Implementations return detections in their own reported order; the
/// locator takes the first one without re-sorting.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in an RGB frame.
    fn detect(&self, frame: &RgbImage) -> DetectResult<Vec<FaceDetection>>;

    /// Backend name for logging and model info.
    fn name(&self) -> &'static str;
}
