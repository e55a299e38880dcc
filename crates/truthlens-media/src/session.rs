//! ONNX Runtime session construction shared by the detector and classifier.

use std::path::Path;

use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use tracing::{debug, info};

use crate::error::{DetectError, DetectResult};

/// Hardware providers to try before CPU, in preference order.
fn accelerated_providers() -> Vec<(&'static str, ExecutionProviderDispatch)> {
    #[allow(unused_mut)]
    let mut providers = Vec::new();

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    providers.push((
        "CUDA",
        ort::execution_providers::CUDAExecutionProvider::default().build(),
    ));

    #[cfg(target_os = "macos")]
    providers.push((
        "CoreML",
        ort::execution_providers::CoreMLExecutionProvider::default().build(),
    ));

    providers
}

fn base_builder() -> DetectResult<SessionBuilder> {
    Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .map_err(|e| DetectError::processing(format!("Failed to configure ONNX session: {e}")))
}

/// Load `model_path` into an ONNX Runtime session.
///
/// Each accelerated provider available on this build is tried in turn. The
/// first one that commits the model wins, otherwise the model runs on CPU.
/// `purpose` only labels the log lines.
pub(crate) fn create_session(model_path: &Path, purpose: &str) -> DetectResult<Session> {
    if !model_path.exists() {
        return Err(DetectError::model_not_found(model_path.display().to_string()));
    }
    let model_bytes = std::fs::read(model_path)?;

    for (provider, dispatch) in accelerated_providers() {
        let attempt = base_builder()?
            .with_execution_providers([dispatch])
            .and_then(|b| b.commit_from_memory(&model_bytes));
        match attempt {
            Ok(session) => {
                info!(purpose, provider, "ONNX session ready");
                return Ok(session);
            }
            Err(e) => debug!(purpose, provider, error = %e, "Execution provider unavailable"),
        }
    }

    let session = base_builder()?
        .commit_from_memory(&model_bytes)
        .map_err(|e| DetectError::processing(format!("Failed to load ONNX model: {e}")))?;
    info!(purpose, provider = "CPU", model = %model_path.display(), "ONNX session ready");
    Ok(session)
}
