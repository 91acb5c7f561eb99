//! Observable replay events
//!
//! Events are explicit and typed.

use std::fmt;

use serde::Serialize;

/// Observable events emitted by the replay engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The feed entered the transaction log replay state
    ReplayStateEnter,
    /// A packet was handed to the execution queue
    ReplayPacketScheduled,
    /// One entry is about to be dispatched
    ReplayEntry,
    /// Throttled replay progress report
    ReplayProgress,
    /// Every entry of a packet was dispatched
    ReplayPacketComplete,
    /// A packet was abandoned
    ReplayPacketFailed,
    /// A precondition the engine relies on does not hold (FATAL)
    ReplayInvariantViolation,
    /// A collaborator panicked while an entry was replayed (FATAL)
    ReplayCollaboratorPanic,
    /// A scheduled task panicked on the executor thread (FATAL)
    ReplayExecutorTaskPanic,
    /// A history wipe is being replayed
    ReplayWipeHistory,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ReplayStateEnter => "REPLAY_STATE_ENTER",
            Event::ReplayPacketScheduled => "REPLAY_PACKET_SCHEDULED",
            Event::ReplayEntry => "REPLAY_ENTRY",
            Event::ReplayProgress => "REPLAY_PROGRESS",
            Event::ReplayPacketComplete => "REPLAY_PACKET_COMPLETE",
            Event::ReplayPacketFailed => "REPLAY_PACKET_FAILED",
            Event::ReplayInvariantViolation => "REPLAY_INVARIANT_VIOLATION",
            Event::ReplayCollaboratorPanic => "REPLAY_COLLABORATOR_PANIC",
            Event::ReplayExecutorTaskPanic => "REPLAY_EXECUTOR_TASK_PANIC",
            Event::ReplayWipeHistory => "REPLAY_WIPE_HISTORY",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Event::ReplayInvariantViolation
                | Event::ReplayCollaboratorPanic
                | Event::ReplayExecutorTaskPanic
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of a `REPLAY_PROGRESS` event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub domain_name: String,
    /// Completion fraction in `0.0..=1.0`
    pub progress: f32,
    pub first: u64,
    pub last: u64,
    pub current: u64,
}

impl ProgressEvent {
    /// Fields in logger form
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("domain", self.domain_name.clone()),
            ("progress", format!("{:.3}", self.progress)),
            ("first", self.first.to_string()),
            ("last", self.last.to_string()),
            ("current", self.current.to_string()),
        ]
    }
}
