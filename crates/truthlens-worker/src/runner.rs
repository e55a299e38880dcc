//! Batch analysis of video files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{error, info};
use truthlens_history::HistoryStore;
use truthlens_media::{
    AnalysisReport, DeepfakeAnalyzer, FfmpegDecoder, ScoringMode, Upload, YuNetConfig,
    YuNetDetector,
};

use crate::config::WorkerConfig;

/// Outcome of one file.
#[derive(Debug)]
pub enum FileOutcome {
    Analyzed(Box<AnalysisReport>),
    Failed { path: PathBuf, error: String },
}

/// Build the production analyzer: FFmpeg decoding, YuNet detection and the
/// scoring mode resolved from the classifier model.
pub fn build_analyzer(config: &WorkerConfig) -> anyhow::Result<DeepfakeAnalyzer> {
    let analyzer_config = &config.analyzer;

    let Some(detector_model) = analyzer_config.detector_model.as_deref() else {
        bail!("TRUTHLENS_DETECTOR_MODEL is not set; a YuNet ONNX model is required");
    };

    let detector = YuNetDetector::new(
        detector_model,
        YuNetConfig {
            score_threshold: analyzer_config.detector_score_threshold,
            nms_threshold: analyzer_config.detector_nms_threshold,
            ..Default::default()
        },
    )
    .context("Failed to load face detector")?;

    let mode = ScoringMode::load(
        analyzer_config.classifier_model.as_deref(),
        &analyzer_config.classifier_output,
    );

    let analyzer = DeepfakeAnalyzer::from_config(
        analyzer_config,
        Arc::new(FfmpegDecoder::new()),
        Arc::new(detector),
        mode,
    )?;

    Ok(analyzer)
}

/// Analyze one file through the upload path and record the result.
pub async fn analyze_file(
    analyzer: &Arc<DeepfakeAnalyzer>,
    store: &dyn HistoryStore,
    path: &Path,
) -> anyhow::Result<AnalysisReport> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let report = analyzer.analyze_upload(Upload::new(filename, bytes)).await?;
    store.record(report.record.clone())?;
    Ok(report)
}

/// Analyze every path in order. Failures are collected, not fatal.
pub async fn analyze_files(
    analyzer: &Arc<DeepfakeAnalyzer>,
    store: &dyn HistoryStore,
    paths: &[PathBuf],
) -> Vec<FileOutcome> {
    let mut outcomes = Vec::with_capacity(paths.len());

    for path in paths {
        match analyze_file(analyzer, store, path).await {
            Ok(report) => {
                info!(
                    path = %path.display(),
                    verdict = %report.result.verdict,
                    confidence = report.result.confidence,
                    "File analyzed"
                );
                outcomes.push(FileOutcome::Analyzed(Box::new(report)));
            }
            Err(e) => {
                error!(path = %path.display(), error = %format!("{e:#}"), "File analysis failed");
                outcomes.push(FileOutcome::Failed {
                    path: path.clone(),
                    error: format!("{e:#}"),
                });
            }
        }
    }

    outcomes
}
