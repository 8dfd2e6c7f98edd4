//! Output traits and types
//!
//! This module defines the trait interface for batch sinks and the
//! summary returned by a finished crawl.

use crate::record::Record;
use crate::storage::RunStatus;
use crate::FlushError;
use chrono::{DateTime, Utc};
use std::fmt;

/// A group of records flushed together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based, increasing by one per flush
    pub index: u32,
    pub records: Vec<Record>,
}

/// What a successful flush wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub index: u32,
    pub size: usize,
}

/// Durable destination for batches
///
/// A sink sees every batch exactly once, in index order. Any error it
/// returns ends the run; batches persisted earlier stay valid.
pub trait BatchSink: Send {
    /// Writes one batch
    fn persist(&mut self, batch: &Batch) -> Result<(), FlushError>;

    /// Called once after the last batch
    fn close(&mut self, _status: RunStatus) -> Result<(), FlushError> {
        Ok(())
    }
}

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The record cap was reached
    CapReached,

    /// Every partition ran out of pages
    PartitionsExhausted,

    /// The cancellation token fired
    Cancelled,

    /// A batch could not be persisted
    Failed,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CapReached => "cap_reached",
            Self::PartitionsExhausted => "partitions_exhausted",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters collected over one crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub accepted: u64,
    pub duplicates: u64,
    pub extraction_failures: u64,
    pub detail_failures: u64,
    pub listing_failures: u64,
    pub pages_fetched: u64,
    pub partitions_completed: u64,
    pub batches_flushed: u64,
    pub stop_reason: Option<StopReason>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Detail links that produced neither a record nor a duplicate
    pub fn skipped_links(&self) -> u64 {
        self.extraction_failures + self.detail_failures
    }

    /// Share of processed detail links that became records, as a percentage
    pub fn acceptance_rate(&self) -> f64 {
        let processed = self.accepted + self.duplicates + self.skipped_links();
        if processed == 0 {
            return 0.0;
        }
        (self.accepted as f64 / processed as f64) * 100.0
    }

    /// Wall-clock duration in seconds, when both timestamps are set
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}
