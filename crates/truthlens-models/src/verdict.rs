//! Verdict and scoring-mode labels for a video analysis.
//!
//! - `Authentic`: mean fake-probability below the authentic threshold
//! - `Suspicious`: mean fake-probability between the two thresholds (inclusive)
//! - `Fake`: mean fake-probability above the fake threshold
//! - `NoFaces`: no sampled frame produced a scorable face

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Final per-video classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Faces look genuine.
    Authentic,
    /// Evidence is inconclusive.
    Suspicious,
    /// Faces look synthetic or altered.
    Fake,
    /// Nothing to score.
    NoFaces,
}

impl Verdict {
    /// Wire name of the verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Authentic => "AUTHENTIC",
            Verdict::Suspicious => "SUSPICIOUS",
            Verdict::Fake => "FAKE",
            Verdict::NoFaces => "NO_FACES",
        }
    }

    /// Returns true if at least one face contributed to this verdict.
    pub fn has_faces(&self) -> bool {
        !matches!(self, Verdict::NoFaces)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = VerdictParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AUTHENTIC" | "REAL" => Ok(Verdict::Authentic),
            "SUSPICIOUS" => Ok(Verdict::Suspicious),
            "FAKE" => Ok(Verdict::Fake),
            "NO_FACES" => Ok(Verdict::NoFaces),
            _ => Err(VerdictParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown verdict: {0}")]
pub struct VerdictParseError(String);

/// Which scorer produced the numbers in a result.
///
/// `Placeholder` numbers are random draws and must never be presented as
/// model predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScoringModeLabel {
    /// Every score came from the loaded classifier.
    Model,
    /// At least one score is a placeholder draw.
    Placeholder,
}

impl ScoringModeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringModeLabel::Model => "model",
            ScoringModeLabel::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for ScoringModeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
