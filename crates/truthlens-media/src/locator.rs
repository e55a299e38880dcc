//! Face location and canonical face crops.
//!
//! For each frame the locator runs the detector, takes the first detection
//! in detector order, pads it by `floor(ratio * max(w, h))` on each side,
//! clamps it to the frame and resizes the crop to a square RGB raster.

use std::sync::Arc;

use image::{imageops, RgbImage};
use tracing::trace;

use crate::detector::FaceDetector;
use crate::error::DetectResult;
use crate::models::{BoundingBox, CropRegion};
use crate::sampler::Frame;

/// Default canonical face size.
pub const DEFAULT_FACE_SIZE: u32 = 224;

/// Default padding ratio applied on each side of a face box.
pub const DEFAULT_PADDING_RATIO: f64 = 0.1;

/// A fixed-size face raster cut from one frame.
#[derive(Debug, Clone)]
pub struct FaceCrop {
    /// Index of the source frame
    pub frame_index: u64,
    /// `face_size`×`face_size` RGB raster
    pub image: RgbImage,
    /// Region of the source frame the crop was taken from
    pub region: CropRegion,
}

/// Finds the primary face in a frame and produces a canonical crop.
pub struct FaceLocator {
    detector: Arc<dyn FaceDetector>,
    face_size: u32,
    padding_ratio: f64,
}

impl FaceLocator {
    pub fn new(detector: Arc<dyn FaceDetector>, face_size: u32, padding_ratio: f64) -> Self {
        Self {
            detector,
            face_size,
            padding_ratio,
        }
    }

    pub fn face_size(&self) -> u32 {
        self.face_size
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Locate the primary face of `frame`.
    ///
    /// `Ok(None)` means no face. Errors come only from the detector.
    pub fn locate(&self, frame: &Frame) -> DetectResult<Option<FaceCrop>> {
        let detections = self.detector.detect(&frame.image)?;
        let Some(first) = detections.first() else {
            trace!(frame = frame.index, "No face detected");
            return Ok(None);
        };

        let Some(region) =
            pad_and_clamp(&first.bbox, frame.width(), frame.height(), self.padding_ratio)
        else {
            trace!(frame = frame.index, "Face region empty after clamping");
            return Ok(None);
        };

        let cropped =
            imageops::crop_imm(&frame.image, region.x, region.y, region.width, region.height)
                .to_image();
        let image = imageops::resize(
            &cropped,
            self.face_size,
            self.face_size,
            imageops::FilterType::Triangle,
        );

        Ok(Some(FaceCrop {
            frame_index: frame.index,
            image,
            region,
        }))
    }
}

/// Pad `bbox` by `floor(ratio * max(w, h))` per side and clamp to the frame.
///
/// The returned region always lies inside `[0, frame_w) x [0, frame_h)`.
/// Returns `None` when nothing of the box remains inside the frame.
pub fn pad_and_clamp(
    bbox: &BoundingBox,
    frame_w: u32,
    frame_h: u32,
    ratio: f64,
) -> Option<CropRegion> {
    let finite = [bbox.x, bbox.y, bbox.width, bbox.height]
        .iter()
        .all(|v| v.is_finite());
    if !finite || frame_w == 0 || frame_h == 0 {
        return None;
    }

    // Edges are clamped in f64 so boxes far outside the frame cannot overflow.
    let fw = f64::from(frame_w);
    let fh = f64::from(frame_h);
    let x = bbox.x.floor();
    let y = bbox.y.floor();
    let w = bbox.width.max(0.0).floor();
    let h = bbox.height.max(0.0).floor();
    let padding = (ratio * w.max(h)).floor();

    let x1 = (x - padding).clamp(0.0, fw);
    let y1 = (y - padding).clamp(0.0, fh);
    let x2 = (x + w + padding).clamp(0.0, fw);
    let y2 = (y + h + padding).clamp(0.0, fh);

    let region = CropRegion {
        x: x1 as u32,
        y: y1 as u32,
        width: (x2 - x1).max(0.0) as u32,
        height: (y2 - y1).max(0.0) as u32,
    };

    (!region.is_empty()).then_some(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectError;
    use crate::models::FaceDetection;

    struct FixedDetector(Vec<FaceDetection>);

    impl FaceDetector for FixedDetector {
        fn detect(&self, _frame: &RgbImage) -> DetectResult<Vec<FaceDetection>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct BrokenDetector;

    impl FaceDetector for BrokenDetector {
        fn detect(&self, _frame: &RgbImage) -> DetectResult<Vec<FaceDetection>> {
            Err(DetectError::detection_failed("boom"))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn frame(w: u32, h: u32) -> Frame {
        Frame::new(7, RgbImage::new(w, h))
    }

    #[test]
    fn test_pad_interior_box() {
        let bbox = BoundingBox::new(100.0, 100.0, 50.0, 40.0);
        let region = pad_and_clamp(&bbox, 640, 480, 0.1).unwrap();
        // padding = floor(0.1 * 50) = 5
        assert_eq!(
            region,
            CropRegion {
                x: 95,
                y: 95,
                width: 60,
                height: 50
            }
        );
    }

    #[test]
    fn test_pad_clamps_at_edges() {
        let bbox = BoundingBox::new(-10.0, 2.0, 100.0, 100.0);
        let region = pad_and_clamp(&bbox, 120, 90, 0.1).unwrap();
        assert_eq!(region.x, 0);
        assert_eq!(region.y, 0);
        assert!(region.x2() <= 120);
        assert!(region.y2() <= 90);
    }

    #[test]
    fn test_pad_never_leaves_frame() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(630.0, 470.0, 40.0, 40.0),
            BoundingBox::new(-50.0, -50.0, 800.0, 600.0),
            BoundingBox::new(600.5, 10.2, 39.9, 20.7),
        ];
        for bbox in boxes {
            let region = pad_and_clamp(&bbox, 640, 480, 0.1).unwrap();
            assert!(region.x < 640 && region.y < 480);
            assert!(region.x2() <= 640 && region.y2() <= 480);
        }
    }

    #[test]
    fn test_pad_outside_frame_is_none() {
        let bbox = BoundingBox::new(1000.0, 1000.0, 10.0, 10.0);
        assert!(pad_and_clamp(&bbox, 640, 480, 0.1).is_none());

        let bbox = BoundingBox::new(f64::NAN, 0.0, 10.0, 10.0);
        assert!(pad_and_clamp(&bbox, 640, 480, 0.1).is_none());
    }

    #[test]
    fn test_pad_huge_box_covers_frame() {
        let full = CropRegion {
            x: 0,
            y: 0,
            width: 640,
            height: 480,
        };
        for bbox in [
            BoundingBox::new(1e30, 10.0, 1e36, 1e36),
            BoundingBox::new(-1e30, -1e30, 1e36, 1e36),
        ] {
            assert_eq!(pad_and_clamp(&bbox, 640, 480, 0.1), Some(full));
        }

        let bbox = BoundingBox::new(1e30, 1e30, 1e3, 1e3);
        assert!(pad_and_clamp(&bbox, 640, 480, 0.1).is_none());
    }

    #[test]
    fn test_locate_huge_box_stays_in_frame() {
        let detector = FixedDetector(vec![FaceDetection::new(
            BoundingBox::new(-1e30, 10.0, 1e36, f64::MAX),
            0.9,
        )]);
        let locator = FaceLocator::new(Arc::new(detector), 224, 0.1);

        let crop = locator.locate(&frame(320, 240)).unwrap().unwrap();
        assert_eq!(crop.region.x2(), 320);
        assert_eq!(crop.region.y2(), 240);
        assert_eq!(crop.image.dimensions(), (224, 224));
    }

    #[test]
    fn test_locate_uses_first_detection() {
        let detector = FixedDetector(vec![
            FaceDetection::new(BoundingBox::new(10.0, 10.0, 20.0, 20.0), 0.91),
            FaceDetection::new(BoundingBox::new(100.0, 100.0, 80.0, 80.0), 0.99),
        ]);
        let locator = FaceLocator::new(Arc::new(detector), 224, 0.1);

        let crop = locator.locate(&frame(320, 240)).unwrap().unwrap();
        assert_eq!(crop.frame_index, 7);
        assert_eq!(crop.image.dimensions(), (224, 224));
        assert_eq!(
            crop.region,
            CropRegion {
                x: 8,
                y: 8,
                width: 24,
                height: 24
            }
        );
    }

    #[test]
    fn test_locate_no_face() {
        let locator = FaceLocator::new(Arc::new(FixedDetector(Vec::new())), 224, 0.1);
        assert!(locator.locate(&frame(64, 64)).unwrap().is_none());
    }

    #[test]
    fn test_locate_propagates_detector_error() {
        let locator = FaceLocator::new(Arc::new(BrokenDetector), 224, 0.1);
        let err = locator.locate(&frame(64, 64)).unwrap_err();
        assert!(matches!(err, DetectError::DetectionFailed(_)));
    }
}
