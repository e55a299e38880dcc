//! Batch deepfake analysis binary.
//!
//! Usage: `truthlens-analyze <video>...`
//!
//! Prints one JSON report per analyzed file to stdout, followed by the
//! history statistics. Exits with status 1 if any file fails.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};

use truthlens_history::{HistoryStore, RecentDetections};
use truthlens_worker::{analyze_files, build_analyzer, init_tracing, FileOutcome, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        anyhow::bail!("usage: truthlens-analyze <video>...");
    }

    info!("Starting truthlens-analyze");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let metrics = if config.metrics_enabled {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install Prometheus recorder")?,
        )
    } else {
        None
    };

    // Models load once here and are shared read-only afterwards.
    let analyzer = Arc::new(build_analyzer(&config)?);
    info!(model_info = ?analyzer.model_info(), "Analyzer loaded");

    let store = RecentDetections::new(config.history_capacity)?;
    let outcomes = analyze_files(&analyzer, &store, &paths).await;

    let mut failures = 0usize;
    for outcome in &outcomes {
        match outcome {
            FileOutcome::Analyzed(report) => {
                println!("{}", serde_json::to_string(report)?);
            }
            FileOutcome::Failed { path, error } => {
                failures += 1;
                warn!(path = %path.display(), error = %error, "Skipped file");
            }
        }
    }

    println!("{}", serde_json::to_string(&store.stats()?)?);

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }

    if failures > 0 {
        warn!(failures, total = outcomes.len(), "Some files failed");
        std::process::exit(1);
    }

    info!("Analysis run complete");
    Ok(())
}
