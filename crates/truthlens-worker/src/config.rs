//! Worker configuration.

use truthlens_history::DEFAULT_CAPACITY;
use truthlens_media::AnalyzerConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pipeline configuration
    pub analyzer: AnalyzerConfig,
    /// Number of recent detections kept in memory
    pub history_capacity: usize,
    /// Install the Prometheus recorder and dump metrics on exit
    pub metrics_enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            history_capacity: DEFAULT_CAPACITY,
            metrics_enabled: false,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            analyzer: AnalyzerConfig::from_env(),
            history_capacity: std::env::var("TRUTHLENS_HISTORY_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(DEFAULT_CAPACITY),
            metrics_enabled: std::env::var("TRUTHLENS_METRICS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}
