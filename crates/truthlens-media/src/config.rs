//! Analyzer configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

/// Configuration for the detection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    // === Sampling ===
    /// Frames per second to retain from the source (default: 5.0)
    pub target_fps: f64,

    // === Face Crops ===
    /// Side length of the square face crop (default: 224)
    pub face_size: u32,

    /// Padding added on each side of a face box, as a fraction of
    /// `max(width, height)` (default: 0.1)
    pub face_padding_ratio: f64,

    // === Verdict Thresholds ===
    /// Mean fake-probability strictly above this is `FAKE` (default: 0.7)
    pub fake_threshold: f64,

    /// Mean fake-probability strictly below this is `AUTHENTIC` (default: 0.3)
    pub authentic_threshold: f64,

    // === Face Detection ===
    /// YuNet ONNX model path
    pub detector_model: Option<PathBuf>,

    /// Minimum YuNet face score (default: 0.9)
    pub detector_score_threshold: f32,

    /// IoU threshold for YuNet NMS (default: 0.3)
    pub detector_nms_threshold: f32,

    // === Classifier ===
    /// Deepfake classifier ONNX model path; placeholder scoring when absent
    pub classifier_model: Option<PathBuf>,

    /// Name of the classifier output tensor (default: "output")
    pub classifier_output: String,

    // === Uploads ===
    /// Directory for temporary upload copies
    pub work_dir: PathBuf,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            target_fps: 5.0,
            face_size: 224,
            face_padding_ratio: 0.1,
            fake_threshold: 0.7,
            authentic_threshold: 0.3,
            detector_model: None,
            detector_score_threshold: 0.9,
            detector_nms_threshold: 0.3,
            classifier_model: None,
            classifier_output: "output".to_string(),
            work_dir: std::env::temp_dir().join("truthlens"),
        }
    }
}

impl AnalyzerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            target_fps: env_parse("TRUTHLENS_TARGET_FPS").unwrap_or(defaults.target_fps),
            face_size: env_parse("TRUTHLENS_FACE_SIZE").unwrap_or(defaults.face_size),
            face_padding_ratio: env_parse("TRUTHLENS_FACE_PADDING_RATIO")
                .unwrap_or(defaults.face_padding_ratio),
            fake_threshold: env_parse("TRUTHLENS_FAKE_THRESHOLD")
                .unwrap_or(defaults.fake_threshold),
            authentic_threshold: env_parse("TRUTHLENS_AUTHENTIC_THRESHOLD")
                .unwrap_or(defaults.authentic_threshold),
            detector_model: std::env::var("TRUTHLENS_DETECTOR_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            detector_score_threshold: env_parse("TRUTHLENS_DETECTOR_SCORE_THRESHOLD")
                .unwrap_or(defaults.detector_score_threshold),
            detector_nms_threshold: env_parse("TRUTHLENS_DETECTOR_NMS_THRESHOLD")
                .unwrap_or(defaults.detector_nms_threshold),
            classifier_model: std::env::var("TRUTHLENS_CLASSIFIER_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            classifier_output: std::env::var("TRUTHLENS_CLASSIFIER_OUTPUT")
                .unwrap_or(defaults.classifier_output),
            work_dir: std::env::var("TRUTHLENS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> DetectResult<()> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(DetectError::invalid_config(format!(
                "target_fps must be positive, got {}",
                self.target_fps
            )));
        }
        if self.face_size == 0 {
            return Err(DetectError::invalid_config("face_size must be non-zero"));
        }
        if !(0.0..1.0).contains(&self.face_padding_ratio) {
            return Err(DetectError::invalid_config(format!(
                "face_padding_ratio must be in [0, 1), got {}",
                self.face_padding_ratio
            )));
        }
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.fake_threshold) || !in_unit(self.authentic_threshold) {
            return Err(DetectError::invalid_config(
                "verdict thresholds must be in [0, 1]",
            ));
        }
        if self.authentic_threshold > self.fake_threshold {
            return Err(DetectError::invalid_config(format!(
                "authentic_threshold ({}) exceeds fake_threshold ({})",
                self.authentic_threshold, self.fake_threshold
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.target_fps, 5.0);
        assert_eq!(config.face_size, 224);
        assert!((config.face_padding_ratio - 0.1).abs() < 1e-9);
        assert_eq!(config.fake_threshold, 0.7);
        assert_eq!(config.authentic_threshold, 0.3);
        assert!(config.classifier_model.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AnalyzerConfig::default();
        config.target_fps = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.face_size = 0;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.face_padding_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.authentic_threshold = 0.8;
        assert!(config.validate().is_err());
    }
}
