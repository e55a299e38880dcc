//! Deepfake analysis worker.
//!
//! This crate provides:
//! - Environment configuration
//! - Tracing subscriber setup
//! - Analyzer construction with a one-shot model load
//! - Batch analysis of files into a history store

pub mod config;
pub mod logging;
pub mod runner;

pub use config::WorkerConfig;
pub use logging::init_tracing;
pub use runner::{analyze_file, analyze_files, build_analyzer, FileOutcome};
