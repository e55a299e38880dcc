//! Verdict aggregation.
//!
//! The mean fake-probability over all scored faces is mapped to a verdict
//! with two strict thresholds:
//!
//! | mean                        | verdict      | confidence |
//! |-----------------------------|--------------|------------|
//! | `> fake_threshold`          | `FAKE`       | mean       |
//! | `< authentic_threshold`     | `AUTHENTIC`  | 1 - mean   |
//! | otherwise                   | `SUSPICIOUS` | 0.5        |
//!
//! No scores at all yields `NO_FACES` with zero confidence and probability.

use truthlens_models::Verdict;

use crate::scorer::{Score, ScoreSource};

/// Default threshold above which a video is `FAKE`.
pub const DEFAULT_FAKE_THRESHOLD: f64 = 0.7;

/// Default threshold below which a video is `AUTHENTIC`.
pub const DEFAULT_AUTHENTIC_THRESHOLD: f64 = 0.3;

/// Confidence reported for `SUSPICIOUS`.
pub const SUSPICIOUS_CONFIDENCE: f64 = 0.5;

/// Reduced verdict over a sequence of scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub verdict: Verdict,
    pub confidence: f64,
    pub fake_probability: f64,
    pub frames_analyzed: u32,
    /// Scores that came from the placeholder policy
    pub placeholder_scores: u32,
}

/// Three-way threshold policy over the mean fake-probability.
#[derive(Debug, Clone, Copy)]
pub struct VerdictAggregator {
    fake_threshold: f64,
    authentic_threshold: f64,
}

impl Default for VerdictAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_FAKE_THRESHOLD, DEFAULT_AUTHENTIC_THRESHOLD)
    }
}

impl VerdictAggregator {
    pub fn new(fake_threshold: f64, authentic_threshold: f64) -> Self {
        Self {
            fake_threshold,
            authentic_threshold,
        }
    }

    /// Aggregate tagged scores.
    pub fn aggregate(&self, scores: &[Score]) -> Aggregate {
        let values: Vec<f64> = scores.iter().map(|s| s.value).collect();
        let placeholder_scores = scores
            .iter()
            .filter(|s| s.source == ScoreSource::Placeholder)
            .count();

        Aggregate {
            placeholder_scores: saturating_count(placeholder_scores),
            ..self.aggregate_values(&values)
        }
    }

    /// Aggregate raw probabilities.
    pub fn aggregate_values(&self, values: &[f64]) -> Aggregate {
        if values.is_empty() {
            return Aggregate {
                verdict: Verdict::NoFaces,
                confidence: 0.0,
                fake_probability: 0.0,
                frames_analyzed: 0,
                placeholder_scores: 0,
            };
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let (verdict, confidence) = self.classify(mean);

        Aggregate {
            verdict,
            confidence,
            fake_probability: mean,
            frames_analyzed: saturating_count(values.len()),
            placeholder_scores: 0,
        }
    }

    fn classify(&self, mean: f64) -> (Verdict, f64) {
        if mean > self.fake_threshold {
            (Verdict::Fake, mean)
        } else if mean < self.authentic_threshold {
            (Verdict::Authentic, 1.0 - mean)
        } else {
            (Verdict::Suspicious, SUSPICIOUS_CONFIDENCE)
        }
    }
}

/// Counts are reported as `u32`; larger counts saturate.
fn saturating_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
