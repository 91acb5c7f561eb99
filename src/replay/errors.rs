//! Replay error types
//!
//! Error codes:
//! - REPLAY_DECODE_FAILED (FATAL)
//! - REPLAY_UNKNOWN_ENTRY_TYPE (FATAL)
//! - REPLAY_NO_ACTIVE_FEED_VIEW (FATAL)
//! - REPLAY_COLLABORATOR_FAILED (FATAL)
//! - REPLAY_EXECUTOR_CLOSED (FATAL)
//!
//! Every replay error is fatal for the packet it occurs in. Entries already
//! dispatched from that packet stay applied.

use std::fmt;
use std::io;

/// Severity levels for replay errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The packet is abandoned and the enclosing recovery must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Replay-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayErrorCode {
    /// Entry bytes are truncated, malformed, or fail their checksum
    ReplayDecodeFailed,
    /// Entry carries a type tag no operation maps to
    ReplayUnknownEntryType,
    /// A document-bearing operation arrived with no feed view installed
    ReplayNoActiveFeedView,
    /// A downstream collaborator refused or failed an operation
    ReplayCollaboratorFailed,
    /// The execution queue no longer accepts work
    ReplayExecutorClosed,
}

impl ReplayErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ReplayErrorCode::ReplayDecodeFailed => "REPLAY_DECODE_FAILED",
            ReplayErrorCode::ReplayUnknownEntryType => "REPLAY_UNKNOWN_ENTRY_TYPE",
            ReplayErrorCode::ReplayNoActiveFeedView => "REPLAY_NO_ACTIVE_FEED_VIEW",
            ReplayErrorCode::ReplayCollaboratorFailed => "REPLAY_COLLABORATOR_FAILED",
            ReplayErrorCode::ReplayExecutorClosed => "REPLAY_EXECUTOR_CLOSED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }

    /// Returns true for codes that signal a broken engine precondition
    /// rather than bad input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, ReplayErrorCode::ReplayNoActiveFeedView)
    }
}

impl fmt::Display for ReplayErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Replay error with serial / offset context
#[derive(Debug, Clone)]
pub struct ReplayError {
    code: ReplayErrorCode,
    message: String,
    serial: Option<u64>,
    offset: Option<u64>,
}

impl ReplayError {
    fn new(code: ReplayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            serial: None,
            offset: None,
        }
    }

    /// Create a decode error
    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::new(ReplayErrorCode::ReplayDecodeFailed, reason)
    }

    /// Create a decode error for the payload of the entry with `serial`
    pub fn payload_decode_failed(serial: u64, reason: impl Into<String>) -> Self {
        Self::decode_failed(reason).with_serial(serial)
    }

    /// Create an unknown entry type error
    pub fn unknown_entry_type(serial: u64, tag: u32) -> Self {
        Self::new(
            ReplayErrorCode::ReplayUnknownEntryType,
            format!("unknown entry type {}", tag),
        )
        .with_serial(serial)
    }

    /// Create an error for a document operation with no feed view installed
    pub fn no_active_feed_view(operation: &str) -> Self {
        Self::new(
            ReplayErrorCode::ReplayNoActiveFeedView,
            format!("no active feed view for {} operation", operation),
        )
    }

    /// Create a collaborator failure
    pub fn collaborator_failed(collaborator: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ReplayErrorCode::ReplayCollaboratorFailed,
            format!("{}: {}", collaborator, reason.into()),
        )
    }

    /// Create a failure for a collaborator that panicked mid-operation
    pub fn collaborator_panicked(reason: impl Into<String>) -> Self {
        Self::new(
            ReplayErrorCode::ReplayCollaboratorFailed,
            format!("collaborator panicked: {}", reason.into()),
        )
    }

    /// Create an executor-closed error
    pub fn executor_closed() -> Self {
        Self::new(
            ReplayErrorCode::ReplayExecutorClosed,
            "execution queue is shut down",
        )
    }

    /// Attach the serial number of the entry being processed
    pub fn with_serial(mut self, serial: u64) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Attach the byte offset within the packet
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns the error code
    pub fn code(&self) -> ReplayErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the entry serial if known
    pub fn serial(&self) -> Option<u64> {
        self.serial
    }

    /// Returns the packet byte offset if known
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        match (self.serial, self.offset) {
            (Some(serial), Some(offset)) => {
                write!(f, " (serial: {}, byte_offset: {})", serial, offset)?
            }
            (Some(serial), None) => write!(f, " (serial: {})", serial)?,
            (None, Some(offset)) => write!(f, " (byte_offset: {})", offset)?,
            (None, None) => {}
        }
        Ok(())
    }
}

impl std::error::Error for ReplayError {}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::decode_failed(e.to_string())
    }
}

/// Result type for replay operations
pub type ReplayResult<T> = Result<T, ReplayError>;
