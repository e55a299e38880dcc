//! Durable records handed to the history collaborator.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::request::RequestId;
use crate::verdict::{ScoringModeLabel, Verdict};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One completed detection, as stored by a history backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionRecord {
    pub request_id: RequestId,

    /// Original upload filename
    pub filename: String,

    pub verdict: Verdict,
    pub confidence: f64,
    pub fake_probability: f64,
    pub frames_analyzed: u32,
    pub total_frames: u32,

    /// Wall-clock time spent in the pipeline
    pub processing_time_sec: f64,

    /// Upload size in MB, rounded to 2 decimals
    pub file_size_mb: f64,

    /// Scorer that produced the numbers (`model` or `placeholder`)
    pub model_used: ScoringModeLabel,

    pub timestamp: DateTime<Utc>,
}

impl DetectionRecord {
    /// Build a record from a finished analysis.
    pub fn from_result(
        request_id: RequestId,
        filename: impl Into<String>,
        file_size_bytes: u64,
        processing_time_sec: f64,
        result: &AnalysisResult,
    ) -> Self {
        Self {
            request_id,
            filename: filename.into(),
            verdict: result.verdict,
            confidence: result.confidence,
            fake_probability: result.fake_probability,
            frames_analyzed: result.frames_analyzed,
            total_frames: result.total_frames,
            processing_time_sec,
            file_size_mb: round2(file_size_bytes as f64 / BYTES_PER_MB),
            model_used: result.scoring_mode,
            timestamp: Utc::now(),
        }
    }
}

/// Static description of the loaded detection stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelInfo {
    pub scoring_mode: ScoringModeLabel,

    /// Face detector backend name
    pub detector: String,

    /// Classifier backend name (absent in placeholder mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,

    /// Side length of the square face crop fed to the classifier
    pub face_size: u32,

    /// Sampling rate in frames per second
    pub target_fps: f64,
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_result() {
        let result = AnalysisResult {
            verdict: Verdict::Fake,
            confidence: 0.9,
            fake_probability: 0.9,
            frames_analyzed: 10,
            total_frames: 12,
            scoring_mode: ScoringModeLabel::Placeholder,
            placeholder_scores: 10,
        };
        let record = DetectionRecord::from_result(
            RequestId::from("abc"),
            "clip.mp4",
            5 * 1024 * 1024 + 300_000,
            1.5,
            &result,
        );

        assert_eq!(record.request_id.as_str(), "abc");
        assert_eq!(record.verdict, Verdict::Fake);
        assert_eq!(record.frames_analyzed, 10);
        assert_eq!(record.total_frames, 12);
        assert_eq!(record.file_size_mb, 5.29);
        assert_eq!(record.model_used, ScoringModeLabel::Placeholder);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_1), 1.24);
        assert_eq!(round2(0.0), 0.0);
    }
}
