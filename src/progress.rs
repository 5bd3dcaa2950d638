//! Run counters shared by all worker threads.
//!
//! Plain relaxed atomics: the numbers are only read for the final summary,
//! after every worker has been joined.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RunMetrics {
    dispatched: AtomicU64,
    completed: AtomicU64,
    skipped: AtomicU64,
    with_matches: AtomicU64,
    records: AtomicU64,
    bad_blocks: AtomicU64,
}

/// Snapshot of [`RunMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Units handed to the worker pool.
    pub dispatched: u64,
    /// Units whose region was opened and fully scanned.
    pub completed: u64,
    /// Units skipped because their region could not be opened.
    pub skipped: u64,
    /// Completed units that produced an output file.
    pub with_matches: u64,
    /// Records written across all output files.
    pub records: u64,
    /// Chunks that were out of bounds or failed to decode.
    pub bad_blocks: u64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bad_block(&self) {
        self.bad_blocks.fetch_add(1, Ordering::Relaxed);
    }

    /// A unit finished scanning and wrote `records` records.
    pub fn record_completed(&self, records: u64) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if records > 0 {
            self.with_matches.fetch_add(1, Ordering::Relaxed);
            self.records.fetch_add(records, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            with_matches: self.with_matches.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            bad_blocks: self.bad_blocks.load(Ordering::Relaxed),
        }
    }
}
