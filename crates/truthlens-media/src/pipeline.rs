//! Detection pipeline orchestration.
//!
//! `analyze` runs sampler → locator → scorer → aggregator in a single pass
//! over the video. Per-frame detection failures and per-face scoring
//! failures degrade into "no face" and placeholder scores. Anything else is
//! fatal and surfaces as either `UnreadableSource` or `Processing`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use truthlens_models::{
    round2, AnalysisResult, DetectionRecord, ModelInfo, RequestId, ScoringModeLabel, UploadPolicy,
};

use crate::aggregator::VerdictAggregator;
use crate::config::AnalyzerConfig;
use crate::decoder::VideoDecoder;
use crate::detector::FaceDetector;
use crate::error::{DetectError, DetectResult};
use crate::locator::FaceLocator;
use crate::logging::RequestLogger;
use crate::metrics;
use crate::sampler::FrameSampler;
use crate::scorer::{FaceScorer, ProbabilitySource, Score, ScoringMode};

/// Uploaded video bytes plus caller metadata.
#[derive(Debug, Clone)]
pub struct Upload {
    pub request_id: RequestId,
    /// Original filename; only its extension is used on disk
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            request_id: RequestId::new(),
            filename: filename.into(),
            bytes,
        }
    }
}

/// Result of an upload analysis plus the record for the history store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    pub record: DetectionRecord,
}

/// Composes the pipeline stages into one `analyze` call.
pub struct DeepfakeAnalyzer {
    sampler: FrameSampler,
    locator: FaceLocator,
    scorer: FaceScorer,
    aggregator: VerdictAggregator,
    upload_policy: UploadPolicy,
    work_dir: PathBuf,
    target_fps: f64,
}

impl DeepfakeAnalyzer {
    /// Build an analyzer from validated configuration.
    ///
    /// `mode` is resolved once by the caller (see [`ScoringMode::load`]).
    pub fn from_config(
        config: &AnalyzerConfig,
        decoder: Arc<dyn VideoDecoder>,
        detector: Arc<dyn FaceDetector>,
        mode: ScoringMode,
    ) -> DetectResult<Self> {
        config.validate()?;

        info!(
            decoder = decoder.name(),
            detector = detector.name(),
            scoring_mode = %mode.label(),
            target_fps = config.target_fps,
            face_size = config.face_size,
            "Deepfake analyzer ready"
        );

        Ok(Self {
            sampler: FrameSampler::new(decoder, config.target_fps),
            locator: FaceLocator::new(detector, config.face_size, config.face_padding_ratio),
            scorer: FaceScorer::new(mode),
            aggregator: VerdictAggregator::new(
                config.fake_threshold,
                config.authentic_threshold,
            ),
            upload_policy: UploadPolicy::default(),
            work_dir: config.work_dir.clone(),
            target_fps: config.target_fps,
        })
    }

    /// Replace the source of placeholder scores.
    pub fn with_placeholder_source(mut self, source: Arc<dyn ProbabilitySource>) -> Self {
        let mode = self.scorer.mode().clone();
        self.scorer = FaceScorer::with_source(mode, source);
        self
    }

    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.upload_policy = policy;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn scoring_mode(&self) -> &ScoringMode {
        self.scorer.mode()
    }

    /// Description of the loaded detection stack.
    pub fn model_info(&self) -> ModelInfo {
        let mode = self.scorer.mode();
        ModelInfo {
            scoring_mode: mode.label(),
            detector: self.locator.detector_name().to_string(),
            classifier: mode.classifier_name(),
            face_size: self.locator.face_size(),
            target_fps: self.target_fps,
        }
    }

    /// Analyze the video at `source`.
    ///
    /// Fatal errors are either `UnreadableSource` or `Processing`.
    pub fn analyze(&self, source: &Path) -> DetectResult<AnalysisResult> {
        let start = Instant::now();
        match self.run(source) {
            Ok(result) => {
                metrics::record_analysis(result.verdict, start.elapsed().as_secs_f64());
                Ok(result)
            }
            Err(e) => {
                let e = e.into_fatal();
                warn!(source = %source.display(), error = %e, "Analysis failed");
                metrics::record_analysis_failure(e.class());
                Err(e)
            }
        }
    }

    fn run(&self, source: &Path) -> DetectResult<AnalysisResult> {
        let mut frames = self.sampler.extract(source)?;
        let mut scores: Vec<Score> = Vec::new();
        let mut detection_failures = 0u32;

        for frame in frames.by_ref() {
            let frame = frame?;
            let crop = match self.locator.locate(&frame) {
                Ok(crop) => crop,
                Err(e) => {
                    debug!(frame = frame.index, error = %e, "Face detection failed, skipping frame");
                    metrics::record_detection_failure();
                    detection_failures += 1;
                    None
                }
            };

            if let Some(crop) = crop {
                scores.push(self.scorer.score(&crop));
            }
        }

        let total_frames = u32::try_from(frames.frames_retained())
            .map_err(|_| DetectError::processing("Sampled frame count exceeds u32"))?;
        metrics::record_frames_sampled(u64::from(total_frames));

        if detection_failures > 0 {
            warn!(
                failures = detection_failures,
                total_frames, "Face detection failed on some frames"
            );
        }

        let aggregate = self.aggregator.aggregate(&scores);
        let result = if !aggregate.verdict.has_faces() {
            AnalysisResult::no_faces(total_frames, self.scorer.mode().label())
        } else {
            let scoring_mode = if aggregate.placeholder_scores > 0 {
                ScoringModeLabel::Placeholder
            } else {
                self.scorer.mode().label()
            };
            AnalysisResult {
                verdict: aggregate.verdict,
                confidence: aggregate.confidence,
                fake_probability: aggregate.fake_probability,
                frames_analyzed: aggregate.frames_analyzed,
                total_frames,
                scoring_mode,
                placeholder_scores: aggregate.placeholder_scores,
            }
        };

        info!(
            verdict = %result.verdict,
            confidence = result.confidence,
            fake_probability = result.fake_probability,
            frames_analyzed = result.frames_analyzed,
            total_frames = result.total_frames,
            coverage = result.coverage(),
            scoring_mode = %result.scoring_mode,
            "Analysis complete"
        );

        Ok(result)
    }

    /// Analyze uploaded bytes.
    ///
    /// The bytes are written to a uniquely named temporary file in the work
    /// directory. The file is owned by the blocking task running the
    /// pipeline and is removed when that task finishes, whatever the outcome
    /// and even if the returned future is dropped.
    pub async fn analyze_upload(self: &Arc<Self>, upload: Upload) -> DetectResult<AnalysisReport> {
        let logger = RequestLogger::new(&upload.request_id, "analyze_upload");
        let size_bytes = upload.bytes.len() as u64;

        let extension = match self.upload_policy.validate(&upload.filename, size_bytes) {
            Ok(extension) => extension,
            Err(rejection) => {
                logger.log_warning(&rejection.to_string());
                let e = DetectError::from(rejection);
                metrics::record_analysis_failure(e.class());
                return Err(e);
            }
        };

        logger.log_start(&format!(
            "{} ({:.2} MB)",
            upload.filename,
            size_bytes as f64 / (1024.0 * 1024.0)
        ));

        let analyzer = Arc::clone(self);
        let span = logger.create_span();
        let Upload {
            request_id,
            filename,
            bytes,
        } = upload;
        let prefix = temp_prefix(&request_id);
        let task_logger = logger.clone();

        let start = Instant::now();
        let task = tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            let temp = match write_temp_upload(&analyzer.work_dir, &prefix, &extension, &bytes) {
                Ok(temp) => temp,
                Err(e) => {
                    let e = e.into_fatal();
                    metrics::record_analysis_failure(e.class());
                    return Err(e);
                }
            };
            drop(bytes);
            debug!(path = %temp.path().display(), "Saved upload to temporary file");
            task_logger.log_progress("upload saved, sampling frames");

            analyzer.analyze(temp.path())
        });

        let result = match task.await {
            Ok(result) => result,
            Err(e) => {
                let e = DetectError::processing(format!("Analysis task failed: {e}"));
                metrics::record_analysis_failure(e.class());
                Err(e)
            }
        }?;

        let processing_time = round2(start.elapsed().as_secs_f64());
        let record =
            DetectionRecord::from_result(request_id, filename, size_bytes, processing_time, &result);

        logger.log_completion(&format!(
            "{} with confidence {:.2} in {:.2}s",
            result.verdict, result.confidence, processing_time
        ));

        Ok(AnalysisReport { result, record })
    }
}

/// File-name prefix for an upload's temporary file.
///
/// Request ids come from callers, so anything outside `[A-Za-z0-9_-]` is
/// dropped to keep the file inside the work directory.
fn temp_prefix(request_id: &RequestId) -> String {
    let safe: String = request_id
        .to_string()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(64)
        .collect();
    if safe.is_empty() {
        "upload_".to_string()
    } else {
        format!("{safe}_")
    }
}

/// Write `bytes` to a new temporary file in `dir`.
fn write_temp_upload(
    dir: &Path,
    prefix: &str,
    extension: &str,
    bytes: &[u8],
) -> DetectResult<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let mut temp = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(extension)
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    Ok(temp)
}
