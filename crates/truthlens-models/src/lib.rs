//! Shared data models for the TruthLens backend.
//!
//! This crate provides Serde-serializable types for:
//! - Verdicts and scoring-mode labels
//! - Per-video analysis results
//! - Detection records handed to history backends
//! - Upload intake limits

pub mod analysis;
pub mod record;
pub mod request;
pub mod upload;
pub mod verdict;

// Re-export common types
pub use analysis::AnalysisResult;
pub use record::{round2, DetectionRecord, ModelInfo};
pub use request::RequestId;
pub use upload::{extension_of, UploadPolicy, UploadRejection, MAX_UPLOAD_BYTES};
pub use verdict::{ScoringModeLabel, Verdict, VerdictParseError};
