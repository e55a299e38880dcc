//! Pipeline metrics.
//!
//! Emitted through the `metrics` facade; they are no-ops until a recorder
//! (e.g. the Prometheus exporter in the worker) is installed.

use metrics::{counter, histogram};
use truthlens_models::Verdict;

use crate::error::ErrorClass;

/// Metric names as constants for consistency.
pub mod names {
    pub const ANALYSES_TOTAL: &str = "truthlens_analyses_total";
    pub const ANALYSIS_FAILURES_TOTAL: &str = "truthlens_analysis_failures_total";
    pub const ANALYSIS_DURATION_SECONDS: &str = "truthlens_analysis_duration_seconds";
    pub const FRAMES_SAMPLED_TOTAL: &str = "truthlens_frames_sampled_total";
    pub const FACES_SCORED_TOTAL: &str = "truthlens_faces_scored_total";
    pub const DETECTION_FAILURES_TOTAL: &str = "truthlens_detection_failures_total";
    pub const SCORING_FALLBACKS_TOTAL: &str = "truthlens_scoring_fallbacks_total";
}

/// Record a completed analysis.
pub fn record_analysis(verdict: Verdict, duration_secs: f64) {
    let labels = [("verdict", verdict.as_str().to_string())];
    counter!(names::ANALYSES_TOTAL, &labels).increment(1);
    histogram!(names::ANALYSIS_DURATION_SECONDS).record(duration_secs);
}

/// Record a fatal analysis failure.
pub fn record_analysis_failure(class: ErrorClass) {
    let class = match class {
        ErrorClass::CannotProcess => "cannot_process",
        ErrorClass::Processing => "processing",
    };
    counter!(names::ANALYSIS_FAILURES_TOTAL, "class" => class).increment(1);
}

/// Record frames retained by the sampler.
pub fn record_frames_sampled(count: u64) {
    counter!(names::FRAMES_SAMPLED_TOTAL).increment(count);
}

/// Record one scored face.
pub fn record_face_scored(source: &'static str) {
    counter!(names::FACES_SCORED_TOTAL, "source" => source).increment(1);
}

/// Record a frame skipped because the detector failed.
pub fn record_detection_failure() {
    counter!(names::DETECTION_FAILURES_TOTAL).increment(1);
}

/// Record a face that fell back to a placeholder score after a model error.
pub fn record_scoring_fallback() {
    counter!(names::SCORING_FALLBACKS_TOTAL).increment(1);
}
