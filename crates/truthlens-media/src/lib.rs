//! Deepfake detection pipeline for videos.
//!
//! This crate provides:
//! - Fixed-rate frame sampling over an FFmpeg decode stream
//! - Face location with YuNet on ONNX Runtime, padded and resized to a
//!   canonical crop
//! - Per-face fake-probability scoring with an explicit placeholder mode
//! - Threshold-based verdict aggregation
//! - An orchestrator owning temporary upload files and error translation

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod detector;
pub mod error;
pub mod locator;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod probe;
pub mod sampler;
pub mod scorer;
mod session;
pub mod yunet;

pub use aggregator::{Aggregate, VerdictAggregator};
pub use classifier::{FaceClassifier, OrtFaceClassifier};
pub use config::AnalyzerConfig;
pub use decoder::{FfmpegDecoder, VideoDecoder, VideoHandle};
pub use detector::FaceDetector;
pub use error::{DetectError, DetectResult, ErrorClass};
pub use locator::{pad_and_clamp, FaceCrop, FaceLocator};
pub use logging::RequestLogger;
pub use models::{BoundingBox, CropRegion, FaceDetection};
pub use pipeline::{AnalysisReport, DeepfakeAnalyzer, Upload};
pub use probe::{probe_video, VideoInfo};
pub use sampler::{compute_stride, Frame, FrameSampler, SampledFrames};
pub use scorer::{FaceScorer, ProbabilitySource, Score, ScoreSource, ScoringMode, UniformRandom};
pub use yunet::{YuNetConfig, YuNetDetector};
