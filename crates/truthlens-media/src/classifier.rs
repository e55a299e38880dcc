//! Deepfake face classifier.
//!
//! The production model is an EfficientNet-B0 with a single-logit sigmoid
//! head, exported to ONNX. Input is `[1, 3, H, W]` RGB scaled to `[0, 1]`
//! and normalized with ImageNet statistics.

use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::info;

use crate::error::{DetectError, DetectResult};
use crate::session::create_session;

/// ImageNet channel means (RGB).
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations (RGB).
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Binary real/fake classifier over face crops.
///
/// Implementations must be safe for concurrent inference and are never
/// mutated after load.
pub trait FaceClassifier: Send + Sync {
    /// Fake-probability of one face crop, in `[0, 1]`.
    fn predict(&self, face: &RgbImage) -> DetectResult<f64>;

    /// Model name for logging and model info.
    fn name(&self) -> &str;
}

/// ONNX Runtime-backed classifier.
pub struct OrtFaceClassifier {
    session: Mutex<Session>,
    output_name: String,
    name: String,
}

impl OrtFaceClassifier {
    /// Load the model at `model_path`, reading the output tensor `output_name`.
    pub fn new(model_path: &Path, output_name: impl Into<String>) -> DetectResult<Self> {
        let session = create_session(model_path, "deepfake_classifier")?;
        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "classifier".to_string());

        info!(model = %model_path.display(), "Deepfake classifier loaded");

        Ok(Self {
            session: Mutex::new(session),
            output_name: output_name.into(),
            name,
        })
    }

    fn run_inference(&self, input: Value) -> DetectResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectError::scoring_failed("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| DetectError::scoring_failed(format!("Classifier inference failed: {e}")))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            DetectError::scoring_failed(format!("Missing {} tensor", self.output_name))
        })?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::scoring_failed(format!("Failed to extract tensor: {e}")))?;

        Ok(tensor.1.to_vec())
    }
}

impl FaceClassifier for OrtFaceClassifier {
    fn predict(&self, face: &RgbImage) -> DetectResult<f64> {
        let (w, h) = face.dimensions();
        if w == 0 || h == 0 {
            return Err(DetectError::scoring_failed("Empty face crop"));
        }

        let shape = vec![1usize, 3, h as usize, w as usize];
        let input = Tensor::from_array((shape, normalize_chw(face).into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| DetectError::scoring_failed(format!("Failed to create tensor: {e}")))?;

        let output = self.run_inference(input)?;
        interpret_output(&output)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Convert an RGB raster to a normalized CHW float buffer.
fn normalize_chw(face: &RgbImage) -> Vec<f32> {
    let (w, h) = face.dimensions();
    let plane = (w * h) as usize;
    let mut chw = vec![0f32; 3 * plane];
    for (x, y, pixel) in face.enumerate_pixels() {
        let idx = (y * w + x) as usize;
        for c in 0..3 {
            chw[c * plane + idx] = (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    chw
}

/// Read the single sigmoid output.
fn interpret_output(output: &[f32]) -> DetectResult<f64> {
    match output {
        [value] if value.is_finite() => Ok((*value as f64).clamp(0.0, 1.0)),
        [value] => Err(DetectError::scoring_failed(format!(
            "Classifier produced non-finite output: {value}"
        ))),
        other => Err(DetectError::scoring_failed(format!(
            "Expected a single output value, got {}",
            other.len()
        ))),
    }
}
