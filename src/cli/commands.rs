//! CLI command implementations
//!
//! `inspect` only decodes. `replay` drives a packet through the full replay
//! state on a worker thread, with recording collaborators in place of a live
//! feed, and reports the packet result.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::ReplayEngineConfig;
use crate::observability::{LoggerProgressSink, ReplayMetricsSnapshot};
use crate::replay::{
    EntryType, FeedState, FeedViewSlot, Packet, PacketResult, PacketWrapper, ReplayProgress,
    ReplayTransactionLogState, SingleThreadExecutor,
};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_packet, write_json};
use super::recording::{CallJournal, CollaboratorCall, RecordingBackend, RecordingFeedView};

/// One decoded entry as printed by `inspect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub serial: u64,
    #[serde(rename = "type")]
    pub entry_type: u32,
    pub type_name: &'static str,
    pub size: usize,
}

/// Outcome of `replay`
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub result: PacketResult,
    pub metrics: ReplayMetricsSnapshot,
    pub collaborator_calls: usize,
    #[serde(skip)]
    pub calls: Vec<CollaboratorCall>,
}

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Inspect { packet } => inspect(&packet),
        Command::Replay {
            packet,
            config,
            first,
            last,
        } => replay(&packet, config.as_deref(), first, last),
    }
}

/// Print one JSON line per entry of the packet file
pub fn inspect(packet_path: &Path) -> CliResult<()> {
    let packet = read_packet(packet_path)?;
    for summary in summarize(&packet)? {
        write_json(&summary)?;
    }
    Ok(())
}

/// Decode every entry of `packet`
pub fn summarize(packet: &Packet) -> CliResult<Vec<EntrySummary>> {
    let mut summaries = Vec::new();
    for entry in packet.entries() {
        let entry = entry?;
        summaries.push(EntrySummary {
            serial: entry.serial(),
            entry_type: entry.entry_type(),
            type_name: EntryType::from_u32(entry.entry_type())
                .map(EntryType::name)
                .unwrap_or("unknown"),
            size: entry.payload().len(),
        });
    }
    Ok(summaries)
}

/// Replay the packet file and print the report
pub fn replay(
    packet_path: &Path,
    config_path: Option<&Path>,
    first: Option<u64>,
    last: Option<u64>,
) -> CliResult<()> {
    let config = match config_path {
        Some(path) => ReplayEngineConfig::load(path)?,
        None => ReplayEngineConfig::default(),
    };
    config.apply_log_level()?;

    let packet = read_packet(packet_path)?;
    let report = replay_packet(packet, &config, first, last)?;
    write_json(&report)?;

    match &report.result {
        PacketResult::Ok => Ok(()),
        PacketResult::Failed { message, .. } => Err(CliError::replay_failed(message.clone())),
    }
}

/// Replay `packet` through a fresh replay state and wait for its result.
///
/// The progress range defaults to the packet's own serial range.
pub fn replay_packet(
    packet: Packet,
    config: &ReplayEngineConfig,
    first: Option<u64>,
    last: Option<u64>,
) -> CliResult<ReplayReport> {
    let journal = CallJournal::new();
    let feed_view = FeedViewSlot::with_view(Arc::new(RecordingFeedView::new(
        journal.clone(),
        config.document_type_repo(),
    )));
    let backend = Arc::new(RecordingBackend::new(journal.clone()));

    let sink = if config.verbose_progress {
        LoggerProgressSink::verbose()
    } else {
        LoggerProgressSink::new()
    };
    let state = ReplayTransactionLogState::new(
        config.domain_name.clone(),
        feed_view,
        backend.clone(),
        backend.clone(),
        backend,
    )
    .with_progress_sink(Arc::new(sink));

    let packet_range = packet.serial_range().ok().flatten();
    let first = first.or(packet_range.map(|(f, _)| f)).unwrap_or(0);
    let last = last.or(packet_range.map(|(_, l)| l)).unwrap_or(first);
    let progress = Arc::new(ReplayProgress::new(config.domain_name.clone(), first, last));

    let executor = SingleThreadExecutor::new(config.executor_thread_name.clone())?;
    let wrapper = PacketWrapper::shared(packet, Some(progress));
    if let Err(e) = state.receive(Arc::clone(&wrapper), &executor) {
        return Err(CliError::replay_failed(e.to_string()));
    }
    let result = wrapper.wait();
    executor.shutdown();

    let calls = journal.calls();
    Ok(ReplayReport {
        result,
        metrics: state.metrics().snapshot(),
        collaborator_calls: calls.len(),
        calls,
    })
}
