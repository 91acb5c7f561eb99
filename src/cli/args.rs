//! CLI argument definitions using clap
//!
//! Commands:
//! - tlreplay inspect --packet <path>
//! - tlreplay replay --packet <path> [--config <path>] [--first <serial>] [--last <serial>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tlreplay - transaction log replay packet tool
#[derive(Parser, Debug)]
#[command(name = "tlreplay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a packet file and list its entries
    Inspect {
        /// Path to the packet file
        #[arg(long)]
        packet: PathBuf,
    },

    /// Replay a packet file against recording collaborators
    Replay {
        /// Path to the packet file
        #[arg(long)]
        packet: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// First serial of the replay range (defaults to the packet's first)
        #[arg(long)]
        first: Option<u64>,

        /// Last serial of the replay range (defaults to the packet's last)
        #[arg(long)]
        last: Option<u64>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
