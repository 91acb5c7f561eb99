//! Replay metrics
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared between the caller thread and the replay worker
#[derive(Debug, Default)]
pub struct ReplayMetrics {
    packets_received: AtomicU64,
    packets_completed: AtomicU64,
    packets_failed: AtomicU64,
    entries_replayed: AtomicU64,
    /// Entries acknowledged without any collaborator call
    entries_ignored: AtomicU64,
    last_serial: AtomicU64,
}

impl ReplayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_packets_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_packets_completed(&self) {
        self.packets_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_packets_failed(&self) {
        self.packets_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one dispatched entry
    pub fn record_entry(&self, serial: u64, ignored: bool) {
        self.entries_replayed.fetch_add(1, Ordering::Relaxed);
        if ignored {
            self.entries_ignored.fetch_add(1, Ordering::Relaxed);
        }
        self.last_serial.fetch_max(serial, Ordering::Relaxed);
    }

    pub fn entries_replayed(&self) -> u64 {
        self.entries_replayed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ReplayMetricsSnapshot {
        ReplayMetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_completed: self.packets_completed.load(Ordering::Relaxed),
            packets_failed: self.packets_failed.load(Ordering::Relaxed),
            entries_replayed: self.entries_replayed.load(Ordering::Relaxed),
            entries_ignored: self.entries_ignored.load(Ordering::Relaxed),
            last_serial: self.last_serial.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of the replay counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayMetricsSnapshot {
    pub packets_received: u64,
    pub packets_completed: u64,
    pub packets_failed: u64,
    pub entries_replayed: u64,
    pub entries_ignored: u64,
    pub last_serial: u64,
}
