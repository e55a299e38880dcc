//! YuNet face detector (2023mar ONNX model) on ONNX Runtime.
//!
//! YuNet is a lightweight anchor-free CNN face detector. The model has three
//! detection heads (strides 8, 16 and 32), each producing per-cell class,
//! objectness and box-regression outputs named `cls_{s}`, `obj_{s}` and
//! `bbox_{s}`. Decoding follows OpenCV's `FaceDetectorYN`:
//!
//! - `score = sqrt(clamp(cls) * clamp(obj))`
//! - `cx = (col + dx) * stride`, `cy = (row + dy) * stride`
//! - `w = exp(dw) * stride`, `h = exp(dh) * stride`
//!
//! Frames are letterboxed (top-left anchored, zero padded) into a square
//! BGR input so boxes map back with a single scale factor.

use std::path::Path;
use std::sync::Mutex;

use image::{imageops, RgbImage};
use ndarray::ArrayView2;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::detector::FaceDetector;
use crate::error::{DetectError, DetectResult};
use crate::models::{BoundingBox, FaceDetection};
use crate::session::create_session;

/// Detection head strides.
const STRIDES: [usize; 3] = [8, 16, 32];

/// Maximum candidates kept before NMS.
const TOP_K: usize = 5000;

/// Configuration for YuNet detection.
#[derive(Debug, Clone)]
pub struct YuNetConfig {
    /// Square model input size; must be a multiple of 32
    pub input_size: u32,
    /// Minimum face score
    pub score_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
}

impl Default for YuNetConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            score_threshold: 0.9,
            nms_threshold: 0.3,
        }
    }
}

/// ONNX Runtime-backed YuNet detector.
pub struct YuNetDetector {
    session: Mutex<Session>,
    config: YuNetConfig,
}

impl YuNetDetector {
    /// Load the model at `model_path`.
    pub fn new(model_path: &Path, config: YuNetConfig) -> DetectResult<Self> {
        if config.input_size == 0 || config.input_size % 32 != 0 {
            return Err(DetectError::invalid_config(format!(
                "YuNet input size must be a positive multiple of 32, got {}",
                config.input_size
            )));
        }

        let session = create_session(model_path, "face_detection")?;
        info!(
            model = %model_path.display(),
            input_size = config.input_size,
            score_threshold = config.score_threshold,
            "YuNet face detector initialized"
        );

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    pub fn config(&self) -> &YuNetConfig {
        &self.config
    }

    /// Run the network and collect the raw head outputs per stride.
    fn run_inference(&self, input: Value) -> DetectResult<Vec<HeadOutput>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectError::detection_failed("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| DetectError::detection_failed(format!("YuNet inference failed: {e}")))?;

        let extract = |name: String| -> DetectResult<Vec<f32>> {
            let value = outputs
                .get(name.as_str())
                .ok_or_else(|| DetectError::detection_failed(format!("Missing {name} tensor")))?;
            let (_, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectError::detection_failed(format!("Extract {name}: {e}")))?;
            Ok(data.to_vec())
        };

        STRIDES
            .iter()
            .map(|&stride| -> DetectResult<HeadOutput> {
                Ok(HeadOutput {
                    stride,
                    cls: extract(format!("cls_{stride}"))?,
                    obj: extract(format!("obj_{stride}"))?,
                    bbox: extract(format!("bbox_{stride}"))?,
                })
            })
            .collect()
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&self, frame: &RgbImage) -> DetectResult<Vec<FaceDetection>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DetectError::detection_failed("Empty frame"));
        }

        let size = self.config.input_size;
        let (data, scale) = letterbox_bgr_chw(frame, size);
        let shape = vec![1usize, 3, size as usize, size as usize];
        let input = Tensor::from_array((shape, data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| DetectError::detection_failed(format!("Failed to create tensor: {e}")))?;

        let heads = self.run_inference(input)?;

        let mut candidates = Vec::new();
        for head in &heads {
            candidates.extend(decode_head(head, size as usize, self.config.score_threshold)?);
        }

        let kept = non_maximum_suppression(candidates, self.config.nms_threshold);
        let inv = 1.0 / scale;
        let detections: Vec<FaceDetection> = kept
            .into_iter()
            .map(|d| FaceDetection::new(d.bbox.scale(inv), d.score))
            .collect();

        debug!(count = detections.len(), "YuNet detection completed");
        Ok(detections)
    }

    fn name(&self) -> &'static str {
        "yunet"
    }
}

/// Raw outputs of one detection head.
#[derive(Debug, Clone)]
struct HeadOutput {
    stride: usize,
    cls: Vec<f32>,
    obj: Vec<f32>,
    bbox: Vec<f32>,
}

/// Letterbox `frame` into a `size`×`size` BGR CHW float buffer.
///
/// Returns the buffer and the scale applied to the frame.
fn letterbox_bgr_chw(frame: &RgbImage, size: u32) -> (Vec<f32>, f64) {
    let (w, h) = frame.dimensions();
    let scale = (size as f64 / w as f64).min(size as f64 / h as f64);
    let scaled_w = ((w as f64 * scale).round() as u32).clamp(1, size);
    let scaled_h = ((h as f64 * scale).round() as u32).clamp(1, size);

    let resized = imageops::resize(frame, scaled_w, scaled_h, imageops::FilterType::Triangle);

    let plane = (size * size) as usize;
    let mut chw = vec![0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let idx = (y * size + x) as usize;
        // RGB -> BGR
        chw[idx] = pixel[2] as f32;
        chw[plane + idx] = pixel[1] as f32;
        chw[2 * plane + idx] = pixel[0] as f32;
    }

    (chw, scale)
}

/// Decode one head into candidate detections in input coordinates.
fn decode_head(
    head: &HeadOutput,
    input_size: usize,
    score_threshold: f32,
) -> DetectResult<Vec<FaceDetection>> {
    let cols = input_size / head.stride;
    let rows = input_size / head.stride;
    let cells = rows * cols;

    if head.cls.len() != cells || head.obj.len() != cells || head.bbox.len() != cells * 4 {
        return Err(DetectError::detection_failed(format!(
            "Unexpected YuNet output size for stride {}: cls={}, obj={}, bbox={}, expected {} cells",
            head.stride,
            head.cls.len(),
            head.obj.len(),
            head.bbox.len(),
            cells
        )));
    }

    let bbox = ArrayView2::from_shape((cells, 4), head.bbox.as_slice())
        .map_err(|e| DetectError::detection_failed(format!("Failed to reshape bbox: {e}")))?;

    let stride = head.stride as f64;
    let mut detections = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            let idx = row * cols + col;
            let cls = head.cls[idx].clamp(0.0, 1.0);
            let obj = head.obj[idx].clamp(0.0, 1.0);
            let score = (cls * obj).sqrt();
            if score < score_threshold {
                continue;
            }

            let cx = (col as f64 + bbox[[idx, 0]] as f64) * stride;
            let cy = (row as f64 + bbox[[idx, 1]] as f64) * stride;
            let w = (bbox[[idx, 2]] as f64).exp() * stride;
            let h = (bbox[[idx, 3]] as f64).exp() * stride;

            detections.push(FaceDetection::new(
                BoundingBox::new(cx - w / 2.0, cy - h / 2.0, w, h),
                score,
            ));
        }
    }

    Ok(detections)
}

/// Greedy NMS; output is sorted by descending score.
fn non_maximum_suppression(
    mut detections: Vec<FaceDetection>,
    nms_threshold: f32,
) -> Vec<FaceDetection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    detections.truncate(TOP_K);

    let mut keep: Vec<FaceDetection> = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i]);

        for j in (i + 1)..detections.len() {
            if !suppressed[j] && detections[i].bbox.iou(&detections[j].bbox) > nms_threshold as f64
            {
                suppressed[j] = true;
            }
        }
    }

    keep
}
