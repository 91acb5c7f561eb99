//! Feed state for transaction log replay
//!
//! While a feed is recovering it sits in the replay state. Each packet it
//! receives is scheduled on the executor; the worker decodes the packet,
//! dispatches every entry in order, reports progress, then writes the result
//! and releases the packet's gate.
//!
//! Failure handling:
//! - A bad entry stops the packet. Earlier entries stay applied.
//! - Failures never cross the thread boundary; the caller sees them only
//!   through the packet result.
//! - A refused schedule fails the packet immediately on the caller thread.
//! - A panicking collaborator fails the packet; the worker keeps running.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::dispatcher::ReplayPacketDispatcher;
use super::errors::{ReplayError, ReplayResult};
use super::executor::{panic_message, Executor};
use super::feed::{BucketDbHandler, FeedConfigStore, FeedViewSlot, ReplayConfigNotifier};
use super::handler::TransactionLogReplayHandler;
use super::operation::EntryType;
use super::packet::{PacketResult, PacketWrapper};
use super::progress::handle_progress;
use crate::observability::{
    log_event_with_fields, Event, Logger, LoggerProgressSink, ProgressSink, ReplayMetrics,
    Severity,
};

/// Lifecycle phase of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedStateType {
    Init,
    ReplayTransactionLog,
    Normal,
}

impl FeedStateType {
    pub fn name(&self) -> &'static str {
        match self {
            FeedStateType::Init => "INIT",
            FeedStateType::ReplayTransactionLog => "REPLAY_TRANSACTION_LOG",
            FeedStateType::Normal => "NORMAL",
        }
    }
}

impl fmt::Display for FeedStateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A phase of the feed lifecycle that accepts replay packets
pub trait FeedState: Send + Sync {
    fn state_type(&self) -> FeedStateType;

    /// Name of the document type this feed serves
    fn name(&self) -> &str;

    /// Schedule `wrapper` for replay on `executor`
    fn receive(&self, wrapper: Arc<PacketWrapper>, executor: &dyn Executor) -> ReplayResult<()>;
}

/// Replays transaction log packets against the feed collaborators
pub struct ReplayTransactionLogState {
    doc_type_name: String,
    handler: Arc<TransactionLogReplayHandler>,
    sink: Arc<dyn ProgressSink>,
    metrics: Arc<ReplayMetrics>,
}

impl ReplayTransactionLogState {
    pub fn new(
        name: impl Into<String>,
        feed_view: FeedViewSlot,
        bucket_db: Arc<dyn BucketDbHandler>,
        replay_config: Arc<dyn ReplayConfigNotifier>,
        config_store: Arc<dyn FeedConfigStore>,
    ) -> Self {
        let doc_type_name = name.into();
        log_event_with_fields(
            Event::ReplayStateEnter,
            &[
                ("doc_type", doc_type_name.as_str()),
                ("state", FeedStateType::ReplayTransactionLog.name()),
            ],
        );
        Self {
            doc_type_name,
            handler: Arc::new(TransactionLogReplayHandler::new(
                feed_view,
                bucket_db,
                replay_config,
                config_store,
            )),
            sink: Arc::new(LoggerProgressSink::new()),
            metrics: Arc::new(ReplayMetrics::new()),
        }
    }

    /// Report progress through `sink` instead of the logger
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn metrics(&self) -> &Arc<ReplayMetrics> {
        &self.metrics
    }

    pub fn handler(&self) -> &Arc<TransactionLogReplayHandler> {
        &self.handler
    }
}

impl FeedState for ReplayTransactionLogState {
    fn state_type(&self) -> FeedStateType {
        FeedStateType::ReplayTransactionLog
    }

    fn name(&self) -> &str {
        &self.doc_type_name
    }

    fn receive(&self, wrapper: Arc<PacketWrapper>, executor: &dyn Executor) -> ReplayResult<()> {
        self.metrics.increment_packets_received();
        let bytes = wrapper.packet().len().to_string();
        Logger::debug(
            Event::ReplayPacketScheduled.as_str(),
            &[
                ("bytes", bytes.as_str()),
                ("doc_type", self.doc_type_name.as_str()),
            ],
        );

        let handler = Arc::clone(&self.handler);
        let sink = Arc::clone(&self.sink);
        let metrics = Arc::clone(&self.metrics);
        let worker_wrapper = Arc::clone(&wrapper);
        let scheduled = executor.execute(Box::new(move || {
            handle_packet(&handler, sink.as_ref(), &metrics, &worker_wrapper);
        }));

        if let Err(err) = scheduled {
            self.metrics.increment_packets_failed();
            log_failure(&err);
            wrapper.complete(PacketResult::failed(&err));
            return Err(err);
        }
        Ok(())
    }
}

/// Body of one unit of work
fn handle_packet(
    handler: &TransactionLogReplayHandler,
    sink: &dyn ProgressSink,
    metrics: &ReplayMetrics,
    wrapper: &PacketWrapper,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        replay_entries(handler, sink, metrics, wrapper)
    }))
    .unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        log_event_with_fields(Event::ReplayCollaboratorPanic, &[("reason", reason.as_str())]);
        Err(ReplayError::collaborator_panicked(reason))
    });

    match outcome {
        Ok(entries) => {
            metrics.increment_packets_completed();
            let entries = entries.to_string();
            Logger::debug(
                Event::ReplayPacketComplete.as_str(),
                &[("entries", entries.as_str())],
            );
            wrapper.complete(PacketResult::Ok);
        }
        Err(err) => {
            metrics.increment_packets_failed();
            log_failure(&err);
            wrapper.complete(PacketResult::failed(&err));
        }
    }
}

fn replay_entries(
    handler: &TransactionLogReplayHandler,
    sink: &dyn ProgressSink,
    metrics: &ReplayMetrics,
    wrapper: &PacketWrapper,
) -> ReplayResult<u64> {
    let dispatcher = ReplayPacketDispatcher::new(handler);
    let mut count = 0;
    for entry in wrapper.packet().entries() {
        let entry = entry?;
        let serial = entry.serial();
        if Logger::would_log(Severity::Trace) {
            let serial_str = serial.to_string();
            let entry_type = EntryType::from_u32(entry.entry_type())
                .map(EntryType::name)
                .unwrap_or("unknown");
            Logger::trace(
                Event::ReplayEntry.as_str(),
                &[("serial", serial_str.as_str()), ("type", entry_type)],
            );
        }

        let entry_type = dispatcher.replay_entry(&entry)?;
        metrics.record_entry(serial, is_ignored(entry_type));
        if let Some(progress) = wrapper.progress() {
            handle_progress(progress, serial, sink);
        }
        count += 1;
    }
    Ok(count)
}

/// Entry types acknowledged without any collaborator call
fn is_ignored(entry_type: EntryType) -> bool {
    matches!(
        entry_type,
        EntryType::Noop
            | EntryType::SpoolerReplayStart
            | EntryType::SpoolerReplayComplete
            | EntryType::CreateBucket
    )
}

fn log_failure(err: &ReplayError) {
    let serial = err.serial().map(|s| s.to_string()).unwrap_or_default();
    let offset = err.offset().map(|o| o.to_string()).unwrap_or_default();
    let fields = [
        ("code", err.code().code()),
        ("message", err.message()),
        ("serial", serial.as_str()),
        ("byte_offset", offset.as_str()),
    ];
    if err.code().is_invariant_violation() {
        log_event_with_fields(Event::ReplayInvariantViolation, &fields);
    }
    Logger::error(Event::ReplayPacketFailed.as_str(), &fields);
}
