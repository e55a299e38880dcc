//! Error types for the detection pipeline.

use thiserror::Error;
use truthlens_models::UploadRejection;

/// Result type for detection operations.
pub type DetectResult<T> = Result<T, DetectError>;

/// Errors that can occur while analyzing a video.
///
/// `DetectionFailed` and `ScoringFailed` are per-item failures: the pipeline
/// recovers from them locally and they never reach the caller of `analyze`.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Cannot read video: {0}")]
    UnreadableSource(String),

    #[error("Upload rejected: {0}")]
    Rejected(#[from] UploadRejection),

    #[error("Face detection failed: {0}")]
    DetectionFailed(String),

    #[error("Scoring failed: {0}")]
    ScoringFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The input cannot be processed; the client should send a different file.
    CannotProcess,
    /// Something failed on our side.
    Processing,
}

impl DetectError {
    /// Create an unreadable-source error.
    pub fn unreadable(message: impl Into<String>) -> Self {
        Self::UnreadableSource(message.into())
    }

    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create a scoring failure error.
    pub fn scoring_failed(message: impl Into<String>) -> Self {
        Self::ScoringFailed(message.into())
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a processing error.
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing(message.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            DetectError::UnreadableSource(_) | DetectError::Rejected(_) => {
                ErrorClass::CannotProcess
            }
            _ => ErrorClass::Processing,
        }
    }

    /// HTTP status a web layer should map this error to.
    pub fn http_status_hint(&self) -> u16 {
        match self {
            DetectError::Rejected(rejection) => rejection.status_code(),
            DetectError::UnreadableSource(_) => 422,
            _ => 500,
        }
    }

    /// Collapse into one of the errors `analyze` is allowed to return.
    ///
    /// Client-side failures keep their variant; everything else becomes a
    /// generic `Processing` error.
    pub fn into_fatal(self) -> Self {
        match self {
            DetectError::UnreadableSource(_)
            | DetectError::Rejected(_)
            | DetectError::Processing(_) => self,
            other => DetectError::Processing(other.to_string()),
        }
    }
}
