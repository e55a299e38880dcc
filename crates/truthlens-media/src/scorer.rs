//! Face scoring.
//!
//! The scoring mode is resolved once at process start. In
//! [`ScoringMode::Placeholder`] every face gets a draw from a
//! [`ProbabilitySource`]; in [`ScoringMode::Model`] the classifier runs and a
//! failed prediction falls back to a placeholder draw for that face only.
//! Every [`Score`] records which path produced it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};
use truthlens_models::ScoringModeLabel;

use crate::classifier::{FaceClassifier, OrtFaceClassifier};
use crate::locator::FaceCrop;
use crate::metrics;

/// Source of placeholder fake-probabilities.
pub trait ProbabilitySource: Send + Sync {
    /// A value in `[0, 1]`.
    fn draw(&self) -> f64;
}

/// Uniform draws from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformRandom;

impl ProbabilitySource for UniformRandom {
    fn draw(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// How faces are scored for the lifetime of the process.
#[derive(Clone)]
pub enum ScoringMode {
    Model(Arc<dyn FaceClassifier>),
    Placeholder,
}

impl ScoringMode {
    /// Load the classifier at `model_path`, or fall back to placeholder mode.
    pub fn load(model_path: Option<&Path>, output_name: &str) -> Self {
        let Some(path) = model_path else {
            warn!("No classifier model configured, using placeholder scores");
            return Self::Placeholder;
        };

        match OrtFaceClassifier::new(path, output_name) {
            Ok(classifier) => {
                info!(model = %path.display(), "Scoring with trained model");
                Self::Model(Arc::new(classifier))
            }
            Err(e) => {
                warn!(
                    model = %path.display(),
                    error = %e,
                    "Classifier failed to load, using placeholder scores"
                );
                Self::Placeholder
            }
        }
    }

    pub fn label(&self) -> ScoringModeLabel {
        match self {
            Self::Model(_) => ScoringModeLabel::Model,
            Self::Placeholder => ScoringModeLabel::Placeholder,
        }
    }

    /// Classifier name, if a model is loaded.
    pub fn classifier_name(&self) -> Option<String> {
        match self {
            Self::Model(classifier) => Some(classifier.name().to_string()),
            Self::Placeholder => None,
        }
    }
}

impl fmt::Debug for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(classifier) => f.debug_tuple("Model").field(&classifier.name()).finish(),
            Self::Placeholder => f.write_str("Placeholder"),
        }
    }
}

/// Which path produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    Model,
    Placeholder,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Placeholder => "placeholder",
        }
    }
}

/// Fake-probability of one face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub value: f64,
    pub source: ScoreSource,
}

impl Score {
    pub fn model(value: f64) -> Self {
        Self {
            value,
            source: ScoreSource::Model,
        }
    }

    pub fn placeholder(value: f64) -> Self {
        Self {
            value,
            source: ScoreSource::Placeholder,
        }
    }
}

/// Scores face crops.
pub struct FaceScorer {
    mode: ScoringMode,
    placeholder: Arc<dyn ProbabilitySource>,
}

impl FaceScorer {
    pub fn new(mode: ScoringMode) -> Self {
        Self::with_source(mode, Arc::new(UniformRandom))
    }

    /// Use `source` for placeholder draws.
    pub fn with_source(mode: ScoringMode, source: Arc<dyn ProbabilitySource>) -> Self {
        Self {
            mode,
            placeholder: source,
        }
    }

    pub fn mode(&self) -> &ScoringMode {
        &self.mode
    }

    /// Score one face. Never fails.
    pub fn score(&self, face: &FaceCrop) -> Score {
        let score = match &self.mode {
            ScoringMode::Model(classifier) => match classifier.predict(&face.image) {
                Ok(value) => Score::model(value.clamp(0.0, 1.0)),
                Err(e) => {
                    warn!(
                        frame = face.frame_index,
                        error = %e,
                        "Scoring failed, using placeholder for this face"
                    );
                    metrics::record_scoring_fallback();
                    self.draw()
                }
            },
            ScoringMode::Placeholder => self.draw(),
        };

        metrics::record_face_scored(score.source.as_str());
        score
    }

    fn draw(&self) -> Score {
        Score::placeholder(self.placeholder.draw().clamp(0.0, 1.0))
    }
}
