//! Run statistics and progress reporting.

use chrono::{DateTime, TimeDelta, Utc};
use dollarbars_types::{CumulativeSums, Market};

/// Counters of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Requests sent to the source.
    pub requests: u64,
    /// Pages discarded because they hit the page limit.
    pub truncated_retries: u64,
    /// Requests or days retried after a failure.
    pub transient_retries: u64,
    /// Snapshot days skipped because no file exists for them.
    pub skipped_days: u64,
    /// Batches appended to the store.
    pub batches: u64,
    /// Trades appended to the store.
    pub trades: u64,
    /// Running sums after the last appended trade, if any was appended.
    pub final_sums: Option<CumulativeSums>,
}

/// Position of a run after one page or day.
#[derive(Debug, Clone)]
pub struct IngestProgress {
    /// Time up to which trades have been requested.
    pub position: DateTime<Utc>,
    /// Current window length, for windowed exchanges.
    pub window: Option<TimeDelta>,
    /// Trades in the page just processed.
    pub page_len: usize,
    /// Trades appended so far in this run.
    pub trades: u64,
}

/// Receives progress callbacks from the ingestion controller.
pub trait IngestObserver: Send + Sync {
    /// Called once before the first request.
    fn on_start(&self, _market: &Market, _from: DateTime<Utc>, _until: DateTime<Utc>) {}

    /// Called after every processed page or day.
    fn on_progress(&self, _progress: &IngestProgress) {}

    /// Called once after the run completed.
    fn on_finish(&self, _summary: &IngestSummary) {}
}
