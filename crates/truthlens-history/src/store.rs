//! History store trait and the in-memory ring buffer implementation.

use std::collections::{BTreeMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use truthlens_models::{round2, DetectionRecord, RequestId};

use crate::error::{HistoryError, HistoryResult};

/// Default number of detections kept in memory.
pub const DEFAULT_CAPACITY: usize = 100;

/// Aggregate statistics over stored detections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_detections: u64,

    /// Count per verdict label (`FAKE`, `AUTHENTIC`, ...)
    pub verdict_breakdown: BTreeMap<String, u64>,

    /// Mean processing time in seconds, rounded to 2 decimals
    pub avg_processing_time: f64,

    /// Mean verdict confidence, rounded to 2 decimals
    pub avg_confidence: f64,

    /// Timestamp of the most recent detection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_detection: Option<DateTime<Utc>>,
}

/// Durable store for completed detections.
///
/// Implementations serialize their own writes; callers share them freely.
pub trait HistoryStore: Send + Sync {
    /// Store a completed detection.
    fn record(&self, record: DetectionRecord) -> HistoryResult<()>;

    /// Page of detections, newest first.
    fn history(&self, limit: usize, offset: usize) -> HistoryResult<Vec<DetectionRecord>>;

    /// Look up one detection by request id.
    fn get(&self, request_id: &RequestId) -> HistoryResult<Option<DetectionRecord>>;

    /// Aggregate statistics over every stored detection.
    fn stats(&self) -> HistoryResult<HistoryStats>;
}

/// Bounded ring buffer of the most recent detections.
///
/// When full, the oldest record is evicted.
#[derive(Debug)]
pub struct RecentDetections {
    capacity: usize,
    records: RwLock<VecDeque<DetectionRecord>>,
}

impl Default for RecentDetections {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            records: RwLock::new(VecDeque::with_capacity(DEFAULT_CAPACITY)),
        }
    }
}

impl RecentDetections {
    pub fn new(capacity: usize) -> HistoryResult<Self> {
        if capacity == 0 {
            return Err(HistoryError::InvalidCapacity(capacity));
        }
        Ok(Self {
            capacity,
            records: RwLock::new(VecDeque::with_capacity(capacity)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryStore for RecentDetections {
    fn record(&self, record: DetectionRecord) -> HistoryResult<()> {
        let mut records = self.records.write().map_err(|_| HistoryError::LockPoisoned)?;

        if records.iter().any(|r| r.request_id == record.request_id) {
            return Err(HistoryError::duplicate(record.request_id.as_str()));
        }

        if records.len() == self.capacity {
            if let Some(evicted) = records.pop_front() {
                debug!(request_id = %evicted.request_id, "Evicted oldest detection");
            }
        }

        info!(
            request_id = %record.request_id,
            verdict = %record.verdict,
            "Recorded detection"
        );
        records.push_back(record);
        Ok(())
    }

    fn history(&self, limit: usize, offset: usize) -> HistoryResult<Vec<DetectionRecord>> {
        let records = self.records.read().map_err(|_| HistoryError::LockPoisoned)?;
        Ok(records
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get(&self, request_id: &RequestId) -> HistoryResult<Option<DetectionRecord>> {
        let records = self.records.read().map_err(|_| HistoryError::LockPoisoned)?;
        Ok(records.iter().find(|r| &r.request_id == request_id).cloned())
    }

    fn stats(&self) -> HistoryResult<HistoryStats> {
        let records = self.records.read().map_err(|_| HistoryError::LockPoisoned)?;
        if records.is_empty() {
            return Ok(HistoryStats::default());
        }

        let total = records.len();
        let mut verdict_breakdown = BTreeMap::new();
        let mut time_sum = 0.0;
        let mut confidence_sum = 0.0;

        for record in records.iter() {
            *verdict_breakdown
                .entry(record.verdict.as_str().to_string())
                .or_insert(0) += 1;
            time_sum += record.processing_time_sec;
            confidence_sum += record.confidence;
        }

        Ok(HistoryStats {
            total_detections: total as u64,
            verdict_breakdown,
            avg_processing_time: round2(time_sum / total as f64),
            avg_confidence: round2(confidence_sum / total as f64),
            last_detection: records.iter().map(|r| r.timestamp).max(),
        })
    }
}
