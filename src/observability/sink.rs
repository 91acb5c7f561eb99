//! Destinations for replay progress events
//!
//! `LoggerProgressSink` writes through the JSON logger. `MemoryProgressSink`
//! keeps events in memory for tests and embedding callers.

use std::sync::{Arc, Mutex};

use super::events::{Event, ProgressEvent};
use super::logger::{Logger, Severity};

/// Receives progress events from the replay worker.
pub trait ProgressSink: Send + Sync {
    /// Whether progress events are wanted at all
    fn enabled(&self) -> bool;

    /// Whether every entry should be reported instead of every interval
    fn verbose(&self) -> bool;

    /// Record one progress event
    fn emit(&self, event: &ProgressEvent);
}

/// Writes progress events as `REPLAY_PROGRESS` log lines.
///
/// Verbose when forced by configuration or when DEBUG logging is on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerProgressSink {
    force_verbose: bool,
}

impl LoggerProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose() -> Self {
        Self {
            force_verbose: true,
        }
    }
}

impl ProgressSink for LoggerProgressSink {
    fn enabled(&self) -> bool {
        Logger::would_log(Severity::Info)
    }

    fn verbose(&self) -> bool {
        self.force_verbose || Logger::would_log(Severity::Debug)
    }

    fn emit(&self, event: &ProgressEvent) {
        let owned = event.fields();
        let fields: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();
        Logger::info(Event::ReplayProgress.as_str(), &fields);
    }
}

/// In-memory progress sink
#[derive(Debug, Clone, Default)]
pub struct MemoryProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
    verbose: bool,
}

impl MemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that reports every entry
    pub fn verbose() -> Self {
        Self {
            events: Arc::default(),
            verbose: true,
        }
    }

    /// All recorded events, oldest first
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressSink for MemoryProgressSink {
    fn enabled(&self) -> bool {
        true
    }

    fn verbose(&self) -> bool {
        self.verbose
    }

    fn emit(&self, event: &ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(current: u64) -> ProgressEvent {
        ProgressEvent {
            domain_name: "music".into(),
            progress: 0.0,
            first: 1,
            last: 10,
            current,
        }
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemoryProgressSink::new();
        assert!(sink.is_empty());

        sink.emit(&event(1));
        sink.emit(&event(2));

        let currents: Vec<u64> = sink.events().iter().map(|e| e.current).collect();
        assert_eq!(currents, vec![1, 2]);
    }

    #[test]
    fn test_memory_sink_clones_share_events() {
        let sink = MemoryProgressSink::verbose();
        let clone = sink.clone();
        clone.emit(&event(3));
        assert_eq!(sink.len(), 1);
        assert!(sink.verbose());
    }

    #[test]
    fn test_forced_verbose_logger_sink() {
        assert!(LoggerProgressSink::verbose().verbose());
    }
}
