//! Observability for the replay engine
//!
//! - Structured logging (JSON)
//! - Typed lifecycle events
//! - Throttled progress reporting through pluggable sinks
//! - Replay counters
//!
//! # Usage
//!
//! ```ignore
//! use tlreplay::observability::{log_event_with_fields, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Debug);
//! log_event_with_fields(Event::ReplayPacketComplete, &[("entries", "42")]);
//! ```

mod events;
mod logger;
mod metrics;
mod sink;

pub use events::{Event, ProgressEvent};
pub use logger::{Logger, Severity};
pub use metrics::{ReplayMetrics, ReplayMetricsSnapshot};
pub use sink::{LoggerProgressSink, MemoryProgressSink, ProgressSink};

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
