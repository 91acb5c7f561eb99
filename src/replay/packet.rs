//! Packet hand-off across the worker thread boundary
//!
//! A `PacketWrapper` is built by the caller, shared with exactly one unit of
//! work, and observed by the caller through its `CompletionGate`. The gate
//! holds the result and is released once, after the result is written.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use serde::Serialize;

use super::entry::Packet;
use super::errors::{ReplayError, ReplayErrorCode};
use super::progress::ReplayProgress;

/// Outcome of replaying one packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PacketResult {
    Ok,
    Failed { code: String, message: String },
}

impl PacketResult {
    /// Failure result describing `err`
    pub fn failed(err: &ReplayError) -> Self {
        PacketResult::Failed {
            code: err.code().code().to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PacketResult::Ok)
    }

    /// Whether this failure carries `code`
    pub fn has_code(&self, code: ReplayErrorCode) -> bool {
        match self {
            PacketResult::Ok => false,
            PacketResult::Failed { code: c, .. } => c == code.code(),
        }
    }
}

impl fmt::Display for PacketResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketResult::Ok => write!(f, "OK"),
            PacketResult::Failed { message, .. } => write!(f, "FAILED {}", message),
        }
    }
}

/// Write-once result cell released to waiters exactly once
#[derive(Debug, Default)]
pub struct CompletionGate {
    result: Mutex<Option<PacketResult>>,
    released: Condvar,
}

impl CompletionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `result` and release waiters.
    ///
    /// Returns false if the gate was already released; the first result
    /// stands.
    pub fn complete(&self, result: PacketResult) -> bool {
        let mut slot = self
            .result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            return false;
        }
        *slot = Some(result);
        drop(slot);
        self.released.notify_all();
        true
    }

    /// Block until released
    pub fn wait(&self) -> PacketResult {
        let mut slot = self
            .result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            slot = self
                .released
                .wait(slot)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Block until released or `timeout` elapses
    pub fn wait_timeout(&self, timeout: Duration) -> Option<PacketResult> {
        let slot = self
            .result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let (slot, _) = self
            .released
            .wait_timeout_while(slot, timeout, |r| r.is_none())
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.clone()
    }

    /// The result, if already released
    pub fn result(&self) -> Option<PacketResult> {
        self.result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_complete(&self) -> bool {
        self.result().is_some()
    }
}

/// A packet on its way to the replay worker
#[derive(Debug)]
pub struct PacketWrapper {
    packet: Packet,
    progress: Option<Arc<ReplayProgress>>,
    gate: CompletionGate,
}

impl PacketWrapper {
    pub fn new(packet: Packet, progress: Option<Arc<ReplayProgress>>) -> Self {
        Self {
            packet,
            progress,
            gate: CompletionGate::new(),
        }
    }

    /// Wrapper ready to share with the worker
    pub fn shared(packet: Packet, progress: Option<Arc<ReplayProgress>>) -> Arc<Self> {
        Arc::new(Self::new(packet, progress))
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn progress(&self) -> Option<&ReplayProgress> {
        self.progress.as_deref()
    }

    /// Write the result and release the gate; false if already released
    pub fn complete(&self, result: PacketResult) -> bool {
        self.gate.complete(result)
    }

    pub fn wait(&self) -> PacketResult {
        self.gate.wait()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<PacketResult> {
        self.gate.wait_timeout(timeout)
    }

    pub fn result(&self) -> Option<PacketResult> {
        self.gate.result()
    }

    pub fn is_complete(&self) -> bool {
        self.gate.is_complete()
    }
}
