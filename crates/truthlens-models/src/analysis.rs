//! Per-video analysis result.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::verdict::{ScoringModeLabel, Verdict};

/// Outcome of one `analyze` call.
///
/// Invariants:
/// - `frames_analyzed <= total_frames`
/// - `verdict == NoFaces` iff `frames_analyzed == 0`
/// - for every other verdict, `confidence` is `fake_probability`,
///   `1 - fake_probability`, or exactly `0.5`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub verdict: Verdict,

    /// Certainty of the verdict in [0, 1]
    pub confidence: f64,

    /// Mean fake-probability over analyzed faces in [0, 1]
    pub fake_probability: f64,

    /// Frames that yielded a scored face
    pub frames_analyzed: u32,

    /// Frames retained by the sampler
    pub total_frames: u32,

    /// Which scorer produced the numbers
    pub scoring_mode: ScoringModeLabel,

    /// Scores that came from the placeholder policy (whole-process
    /// placeholder mode or a per-face fallback)
    #[serde(default)]
    pub placeholder_scores: u32,
}

impl AnalysisResult {
    /// Result for a video where no sampled frame produced a face.
    pub fn no_faces(total_frames: u32, scoring_mode: ScoringModeLabel) -> Self {
        Self {
            verdict: Verdict::NoFaces,
            confidence: 0.0,
            fake_probability: 0.0,
            frames_analyzed: 0,
            total_frames,
            scoring_mode,
            placeholder_scores: 0,
        }
    }

    /// Fraction of sampled frames that contributed a score.
    pub fn coverage(&self) -> f64 {
        if self.total_frames == 0 {
            0.0
        } else {
            self.frames_analyzed as f64 / self.total_frames as f64
        }
    }

    /// Check the invariants listed on the type.
    pub fn is_consistent(&self) -> bool {
        if self.frames_analyzed > self.total_frames {
            return false;
        }
        if (self.verdict == Verdict::NoFaces) != (self.frames_analyzed == 0) {
            return false;
        }
        match self.verdict {
            Verdict::NoFaces => self.confidence == 0.0 && self.fake_probability == 0.0,
            Verdict::Fake => self.confidence == self.fake_probability,
            Verdict::Authentic => self.confidence == 1.0 - self.fake_probability,
            Verdict::Suspicious => self.confidence == 0.5,
        }
    }
}
