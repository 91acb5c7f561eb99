//! tlreplay - transaction log replay for document feeds
//!
//! Decodes replay packets read from a transaction log and applies every
//! entry, in serial order, to the collaborators of a recovering feed.
//!
//! - `replay`: entry codec, operations, dispatch, handler, replay state
//! - `observability`: JSON logging, events, progress sinks, counters
//! - `config`: replay engine configuration
//! - `cli`: the `tlreplay` command line tool

pub mod cli;
pub mod config;
pub mod observability;
pub mod replay;
