//! Detection history.
//!
//! This crate provides:
//! - The `HistoryStore` collaborator trait for recording completed detections
//! - A bounded in-memory store of recent detections
//! - Paginated history, lookup by request id and aggregate statistics

pub mod error;
pub mod store;

pub use error::{HistoryError, HistoryResult};
pub use store::{HistoryStats, HistoryStore, RecentDetections, DEFAULT_CAPACITY};
