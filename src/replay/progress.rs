//! Replay progress tracking
//!
//! The caller creates one `ReplayProgress` per replay range and attaches it
//! to each packet. The worker updates it after every entry and reports it
//! through a `ProgressSink`, throttled to every `REPLAY_PROGRESS_INTERVAL`
//! serials unless the sink is verbose.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::observability::{ProgressEvent, ProgressSink};

/// Serial stride between progress reports in non-verbose mode
pub const REPLAY_PROGRESS_INTERVAL: u64 = 50_000;

/// Position within a replay range `[first, last]`
#[derive(Debug)]
pub struct ReplayProgress {
    domain_name: String,
    first: u64,
    last: u64,
    current: AtomicU64,
}

impl ReplayProgress {
    pub fn new(domain_name: impl Into<String>, first: u64, last: u64) -> Self {
        Self {
            domain_name: domain_name.into(),
            first,
            last,
            current: AtomicU64::new(first),
        }
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    pub fn first(&self) -> u64 {
        self.first
    }

    pub fn last(&self) -> u64 {
        self.last
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Record the serial of the entry just replayed
    pub fn update_current(&self, serial: u64) {
        self.current.store(serial, Ordering::Release);
    }

    /// Fraction of the range replayed, in `0.0..=1.0`
    pub fn progress(&self) -> f32 {
        if self.last <= self.first {
            return 1.0;
        }
        let done = self.current().saturating_sub(self.first) as f64;
        let total = (self.last - self.first) as f64;
        (done / total).clamp(0.0, 1.0) as f32
    }

    /// Snapshot as a progress event
    pub fn to_event(&self) -> ProgressEvent {
        ProgressEvent {
            domain_name: self.domain_name.clone(),
            progress: self.progress(),
            first: self.first,
            last: self.last,
            current: self.current(),
        }
    }
}

/// Advance `progress` to `serial` and report it when due.
///
/// Reports when the sink is enabled and either verbose or `serial` lands on
/// the reporting interval.
pub fn handle_progress(progress: &ReplayProgress, serial: u64, sink: &dyn ProgressSink) {
    progress.update_current(serial);
    if sink.enabled() && (sink.verbose() || serial % REPLAY_PROGRESS_INTERVAL == 0) {
        sink.emit(&progress.to_event());
    }
}
