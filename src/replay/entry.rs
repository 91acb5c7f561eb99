//! Transaction log entry codec
//!
//! A packet is a contiguous buffer of entries written back-to-back.
//! Each entry is self-describing:
//! - Record Length (u32 LE), total bytes including this field and the checksum
//! - Serial Number (u64 LE)
//! - Entry Type (u32 LE)
//! - Payload (variable)
//! - Checksum (u32 LE), CRC32 over everything before it
//!
//! Entries are produced in on-disk order, which the log writer guarantees is
//! serial order. The decoder does not re-sort or check monotonicity.

use crc32fast::Hasher;

use super::errors::{ReplayError, ReplayResult};

/// Fixed bytes per entry: length + serial + type + checksum
pub const ENTRY_OVERHEAD: usize = 4 + 8 + 4 + 4;

fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// One decoded transaction log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    serial: u64,
    entry_type: u32,
    payload: Vec<u8>,
}

impl Entry {
    /// Create a new entry
    pub fn new(serial: u64, entry_type: u32, payload: Vec<u8>) -> Self {
        Self {
            serial,
            entry_type,
            payload,
        }
    }

    /// Serial number assigned by the log writer
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Raw type tag; mapping it to an operation is the dispatcher's job
    pub fn entry_type(&self) -> u32 {
        self.entry_type
    }

    /// Opaque operation payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Size of this entry on the wire
    pub fn encoded_len(&self) -> usize {
        ENTRY_OVERHEAD + self.payload.len()
    }

    /// Serialize the entry, appending to `buf`
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        let record_length = self.encoded_len() as u32;

        buf.extend_from_slice(&record_length.to_le_bytes());
        buf.extend_from_slice(&self.serial.to_le_bytes());
        buf.extend_from_slice(&self.entry_type.to_le_bytes());
        buf.extend_from_slice(&self.payload);

        let checksum = compute_checksum(&buf[start..]);
        buf.extend_from_slice(&checksum.to_le_bytes());
    }

    /// Serialize the entry to a fresh buffer
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.serialize_into(&mut buf);
        buf
    }

    /// Deserialize one entry from the front of `data`, verifying its checksum.
    ///
    /// Returns the entry and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> ReplayResult<(Self, usize)> {
        if data.len() < ENTRY_OVERHEAD {
            return Err(ReplayError::decode_failed(format!(
                "entry truncated: {} bytes remaining, need at least {}",
                data.len(),
                ENTRY_OVERHEAD
            )));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if record_length < ENTRY_OVERHEAD {
            return Err(ReplayError::decode_failed(format!(
                "invalid entry length: {}",
                record_length
            )));
        }

        if data.len() < record_length {
            return Err(ReplayError::decode_failed(format!(
                "entry truncated: expected {} bytes, got {}",
                record_length,
                data.len()
            )));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = compute_checksum(&data[..checksum_offset]);

        if computed_checksum != stored_checksum {
            return Err(ReplayError::decode_failed(format!(
                "checksum mismatch: computed {:08x}, stored {:08x}",
                computed_checksum, stored_checksum
            )));
        }

        let serial = u64::from_le_bytes([
            data[4], data[5], data[6], data[7], data[8], data[9], data[10], data[11],
        ]);
        let entry_type = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
        let payload = data[16..checksum_offset].to_vec();

        Ok((
            Entry {
                serial,
                entry_type,
                payload,
            },
            record_length,
        ))
    }
}

/// Lazy front-to-back decoder over a packet buffer.
///
/// Yields `Err` at most once; after a decode error the decoder is exhausted.
#[derive(Debug)]
pub struct EntryDecoder<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> EntryDecoder<'a> {
    /// Create a decoder over `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            failed: false,
        }
    }

    /// Byte offset of the next entry
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}

impl Iterator for EntryDecoder<'_> {
    type Item = ReplayResult<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        match Entry::deserialize(&self.data[self.offset..]) {
            Ok((entry, consumed)) => {
                self.offset += consumed;
                Some(Ok(entry))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e.with_offset(self.offset as u64)))
            }
        }
    }
}

impl std::iter::FusedIterator for EntryDecoder<'_> {}

/// Decode every entry in `buffer`, lazily
pub fn decode_all(buffer: &[u8]) -> EntryDecoder<'_> {
    EntryDecoder::new(buffer)
}

/// Raw packet bytes as read from the transaction log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    data: Vec<u8>,
}

impl Packet {
    /// Wrap raw packet bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Build a packet from entries, in the given order
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        let mut data = Vec::new();
        for entry in entries {
            entry.serialize_into(&mut data);
        }
        Self { data }
    }

    /// Append one entry
    pub fn add(&mut self, entry: &Entry) {
        entry.serialize_into(&mut self.data);
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Byte length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the packet holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lazily decode the entries
    pub fn entries(&self) -> EntryDecoder<'_> {
        decode_all(&self.data)
    }

    /// First and last serial in the packet, or `None` when empty.
    ///
    /// Decodes the whole packet, so a corrupt entry anywhere is reported.
    pub fn serial_range(&self) -> ReplayResult<Option<(u64, u64)>> {
        let mut range: Option<(u64, u64)> = None;
        for entry in self.entries() {
            let serial = entry?.serial();
            range = Some(match range {
                Some((first, _)) => (first, serial),
                None => (serial, serial),
            });
        }
        Ok(range)
    }
}

impl From<Vec<u8>> for Packet {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}
