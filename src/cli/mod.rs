//! CLI module for tlreplay
//!
//! Provides command-line interface for:
//! - inspect: Decode a packet file and list its entries
//! - replay: Replay a packet file against recording collaborators

mod args;
mod commands;
mod errors;
mod io;
mod recording;

pub use args::{Cli, Command};
pub use commands::{
    inspect, replay, replay_packet, run, run_command, summarize, EntrySummary, ReplayReport,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_packet, write_json};
pub use recording::{CallJournal, CollaboratorCall, RecordingBackend, RecordingFeedView};
