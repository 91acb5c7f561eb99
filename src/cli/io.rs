//! File and stdout handling for the CLI
//!
//! - Packet files are read whole
//! - Output is one JSON object per line on stdout

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use super::errors::{CliError, CliResult};
use crate::replay::Packet;

/// Read a packet file
pub fn read_packet(path: &Path) -> CliResult<Packet> {
    let bytes = fs::read(path).map_err(|e| {
        CliError::io_error(format!("Failed to read packet {}: {}", path.display(), e))
    })?;
    Ok(Packet::new(bytes))
}

/// Write one JSON line to stdout
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    write_json_to(&mut stdout, value)
}

/// Write one JSON line to `writer`
pub fn write_json_to<W: Write, T: Serialize>(writer: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
