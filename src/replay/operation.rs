//! Feed operations carried by transaction log entries
//!
//! Every entry type tag maps to exactly one operation. The legacy update
//! tag decodes into the same `UpdateOperation` as the current one, so there
//! are sixteen tags and fifteen operations.
//!
//! Payload encoding, all little-endian:
//! - integers are fixed width
//! - strings and byte blobs are u32 length-prefixed
//! - a document is `type_name, id, body`
//! - a document update is `type_name, id, update`
//!
//! Trailing bytes after a payload are a decode error.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use super::entry::Entry;
use super::errors::{ReplayError, ReplayResult};

/// Entry type tags as written by the log writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EntryType {
    Put = 1,
    Remove = 2,
    /// Older update encoding without the previous timestamp
    Update42 = 4,
    Noop = 5,
    NewConfig = 6,
    WipeHistory = 7,
    Update = 8,
    DeleteBucket = 9,
    SplitBucket = 10,
    JoinBuckets = 11,
    PruneRemovedDocuments = 12,
    SpoolerReplayStart = 13,
    SpoolerReplayComplete = 14,
    Move = 15,
    CreateBucket = 16,
    CompactLidSpace = 17,
}

impl EntryType {
    /// Every known tag
    pub const ALL: [EntryType; 16] = [
        EntryType::Put,
        EntryType::Remove,
        EntryType::Update42,
        EntryType::Noop,
        EntryType::NewConfig,
        EntryType::WipeHistory,
        EntryType::Update,
        EntryType::DeleteBucket,
        EntryType::SplitBucket,
        EntryType::JoinBuckets,
        EntryType::PruneRemovedDocuments,
        EntryType::SpoolerReplayStart,
        EntryType::SpoolerReplayComplete,
        EntryType::Move,
        EntryType::CreateBucket,
        EntryType::CompactLidSpace,
    ];

    /// Convert from the wire tag, returns None for unknown values
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_u32() == value)
    }

    /// Convert to the wire tag
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Stable lowercase name used in logs
    pub fn name(self) -> &'static str {
        match self {
            EntryType::Put => "put",
            EntryType::Remove => "remove",
            EntryType::Update42 => "update_42",
            EntryType::Noop => "noop",
            EntryType::NewConfig => "new_config",
            EntryType::WipeHistory => "wipe_history",
            EntryType::Update => "update",
            EntryType::DeleteBucket => "delete_bucket",
            EntryType::SplitBucket => "split_bucket",
            EntryType::JoinBuckets => "join_buckets",
            EntryType::PruneRemovedDocuments => "prune_removed_documents",
            EntryType::SpoolerReplayStart => "spooler_replay_start",
            EntryType::SpoolerReplayComplete => "spooler_replay_complete",
            EntryType::Move => "move",
            EntryType::CreateBucket => "create_bucket",
            EntryType::CompactLidSpace => "compact_lid_space",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Identifier of a distribution bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BucketId(pub u64);

impl BucketId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketId(0x{:016x})", self.0)
    }
}

/// Document identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A full document as carried by put and move operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub doc_type: String,
    pub id: DocumentId,
    pub body: Vec<u8>,
}

impl Document {
    pub fn new(doc_type: impl Into<String>, id: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            doc_type: doc_type.into(),
            id: DocumentId::new(id),
            body,
        }
    }
}

/// A partial document update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub doc_type: String,
    pub id: DocumentId,
    pub update: Vec<u8>,
}

impl DocumentUpdate {
    pub fn new(doc_type: impl Into<String>, id: impl Into<String>, update: Vec<u8>) -> Self {
        Self {
            doc_type: doc_type.into(),
            id: DocumentId::new(id),
            update,
        }
    }
}

/// Registry of document types a feed view can accept.
///
/// Document-bearing payloads are decoded against it; a document whose type
/// is not registered fails to decode.
#[derive(Debug, Clone, Default)]
pub struct DocumentTypeRepo {
    types: HashSet<String>,
    accept_all: bool,
}

impl DocumentTypeRepo {
    /// Empty registry, accepts nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the given types
    pub fn with_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            accept_all: false,
        }
    }

    /// Registry that accepts every document type
    pub fn permissive() -> Self {
        Self {
            types: HashSet::new(),
            accept_all: true,
        }
    }

    /// Register a document type
    pub fn register(&mut self, doc_type: impl Into<String>) {
        self.types.insert(doc_type.into());
    }

    /// Whether documents of `doc_type` can be decoded
    pub fn has_type(&self, doc_type: &str) -> bool {
        self.accept_all || self.types.contains(doc_type)
    }
}

/// Consumes the configuration blob of a new-config entry.
///
/// Implemented by the config store; the blob format is its own business.
pub trait NewConfigStreamHandler: Send + Sync {
    fn deserialize_config(&self, serial: u64, config: &[u8]) -> ReplayResult<()>;
}

// Payload encoding helpers

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    put_u32(buf, value.len() as u32);
    buf.extend_from_slice(value);
}

fn put_string(buf: &mut Vec<u8>, value: &str) {
    put_bytes(buf, value.as_bytes());
}

fn put_document(buf: &mut Vec<u8>, doc: &Document) {
    put_string(buf, &doc.doc_type);
    put_string(buf, doc.id.as_str());
    put_bytes(buf, &doc.body);
}

fn put_update(buf: &mut Vec<u8>, update: &DocumentUpdate) {
    put_string(buf, &update.doc_type);
    put_string(buf, update.id.as_str());
    put_bytes(buf, &update.update);
}

/// Cursor over one entry payload; errors carry the entry serial
struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
    serial: u64,
}

impl<'a> PayloadReader<'a> {
    fn new(serial: u64, data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            serial,
        }
    }

    fn error(&self, reason: impl Into<String>) -> ReplayError {
        ReplayError::payload_decode_failed(self.serial, reason)
    }

    fn take(&mut self, len: usize, what: &str) -> ReplayResult<&'a [u8]> {
        let remaining = self.data.len() - self.pos;
        if remaining < len {
            return Err(self.error(format!(
                "payload truncated reading {}: need {} bytes, have {}",
                what, len, remaining
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u32(&mut self, what: &str) -> ReplayResult<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self, what: &str) -> ReplayResult<u64> {
        let b = self.take(8, what)?;
        Ok(u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn bucket(&mut self, what: &str) -> ReplayResult<BucketId> {
        self.u64(what).map(BucketId)
    }

    fn bytes(&mut self, what: &str) -> ReplayResult<Vec<u8>> {
        let len = self.u32(what)? as usize;
        Ok(self.take(len, what)?.to_vec())
    }

    fn string(&mut self, what: &str) -> ReplayResult<String> {
        let raw = self.bytes(what)?;
        String::from_utf8(raw).map_err(|e| self.error(format!("invalid UTF-8 in {}: {}", what, e)))
    }

    fn doc_type(&mut self, repo: &DocumentTypeRepo) -> ReplayResult<String> {
        let doc_type = self.string("document type")?;
        if !repo.has_type(&doc_type) {
            return Err(self.error(format!("unknown document type '{}'", doc_type)));
        }
        Ok(doc_type)
    }

    fn document(&mut self, repo: &DocumentTypeRepo) -> ReplayResult<Document> {
        let doc_type = self.doc_type(repo)?;
        let id = self.string("document id")?;
        let body = self.bytes("document body")?;
        Ok(Document {
            doc_type,
            id: DocumentId(id),
            body,
        })
    }

    fn update(&mut self, repo: &DocumentTypeRepo) -> ReplayResult<DocumentUpdate> {
        let doc_type = self.doc_type(repo)?;
        let id = self.string("document id")?;
        let update = self.bytes("document update")?;
        Ok(DocumentUpdate {
            doc_type,
            id: DocumentId(id),
            update,
        })
    }

    fn finish(self) -> ReplayResult<()> {
        let trailing = self.data.len() - self.pos;
        if trailing != 0 {
            return Err(self.error(format!("{} trailing bytes after payload", trailing)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOperation {
    pub serial: u64,
    pub bucket_id: BucketId,
    pub timestamp: u64,
    pub document: Document,
}

impl PutOperation {
    pub fn deserialize(serial: u64, data: &[u8], repo: &DocumentTypeRepo) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            bucket_id: r.bucket("bucket id")?,
            timestamp: r.u64("timestamp")?,
            document: r.document(repo)?,
        };
        r.finish()?;
        Ok(op)
    }

    fn serialize_payload(&self, buf: &mut Vec<u8>) {
        put_u64(buf, self.bucket_id.raw());
        put_u64(buf, self.timestamp);
        put_document(buf, &self.document);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOperation {
    pub serial: u64,
    pub bucket_id: BucketId,
    pub timestamp: u64,
    pub document_id: DocumentId,
}

impl RemoveOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            bucket_id: r.bucket("bucket id")?,
            timestamp: r.u64("timestamp")?,
            document_id: DocumentId(r.string("document id")?),
        };
        r.finish()?;
        Ok(op)
    }

    fn serialize_payload(&self, buf: &mut Vec<u8>) {
        put_u64(buf, self.bucket_id.raw());
        put_u64(buf, self.timestamp);
        put_string(buf, self.document_id.as_str());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOperation {
    pub serial: u64,
    pub bucket_id: BucketId,
    pub timestamp: u64,
    /// Zero when decoded from the legacy encoding
    pub prev_timestamp: u64,
    pub update: DocumentUpdate,
    /// Decoded from the `Update42` tag
    pub legacy_format: bool,
}

impl UpdateOperation {
    pub fn deserialize(serial: u64, data: &[u8], repo: &DocumentTypeRepo) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            bucket_id: r.bucket("bucket id")?,
            timestamp: r.u64("timestamp")?,
            prev_timestamp: r.u64("previous timestamp")?,
            update: r.update(repo)?,
            legacy_format: false,
        };
        r.finish()?;
        Ok(op)
    }

    pub fn deserialize_legacy(
        serial: u64,
        data: &[u8],
        repo: &DocumentTypeRepo,
    ) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            bucket_id: r.bucket("bucket id")?,
            timestamp: r.u64("timestamp")?,
            prev_timestamp: 0,
            update: r.update(repo)?,
            legacy_format: true,
        };
        r.finish()?;
        Ok(op)
    }

    fn serialize_payload(&self, buf: &mut Vec<u8>) {
        put_u64(buf, self.bucket_id.raw());
        put_u64(buf, self.timestamp);
        if !self.legacy_format {
            put_u64(buf, self.prev_timestamp);
        }
        put_update(buf, &self.update);
    }

    fn entry_type(&self) -> EntryType {
        if self.legacy_format {
            EntryType::Update42
        } else {
            EntryType::Update
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoopOperation {
    pub serial: u64,
}

impl NoopOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        PayloadReader::new(serial, data).finish()?;
        Ok(Self { serial })
    }
}

/// Configuration change marker.
///
/// The configuration itself travels in the entry payload and is consumed by
/// the config store while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewConfigOperation {
    pub serial: u64,
}

impl NewConfigOperation {
    pub fn deserialize(
        serial: u64,
        data: &[u8],
        stream_handler: &dyn NewConfigStreamHandler,
    ) -> ReplayResult<Self> {
        stream_handler.deserialize_config(serial, data)?;
        Ok(Self { serial })
    }

    /// Build a new-config entry carrying `config`
    pub fn entry_with_config(serial: u64, config: &[u8]) -> Entry {
        Entry::new(serial, EntryType::NewConfig.as_u32(), config.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipeHistoryOperation {
    pub serial: u64,
    /// Microseconds since the Unix epoch
    pub wipe_time_limit: u64,
}

impl WipeHistoryOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            wipe_time_limit: r.u64("wipe time limit")?,
        };
        r.finish()?;
        Ok(op)
    }

    /// Wipe time limit as a UTC timestamp, if representable
    pub fn wipe_time_limit_utc(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.wipe_time_limit)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_micros)
    }

    /// Wipe time limit as RFC 3339, or the raw microsecond count when it
    /// does not fit a UTC timestamp
    pub fn wipe_time_limit_display(&self) -> String {
        self.wipe_time_limit_utc()
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Micros, true))
            .unwrap_or_else(|| self.wipe_time_limit.to_string())
    }

    fn serialize_payload(&self, buf: &mut Vec<u8>) {
        put_u64(buf, self.wipe_time_limit);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteBucketOperation {
    pub serial: u64,
    pub bucket_id: BucketId,
}

impl DeleteBucketOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            bucket_id: r.bucket("bucket id")?,
        };
        r.finish()?;
        Ok(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitBucketOperation {
    pub serial: u64,
    pub source: BucketId,
    pub target1: BucketId,
    pub target2: BucketId,
}

impl SplitBucketOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            source: r.bucket("source bucket")?,
            target1: r.bucket("first target bucket")?,
            target2: r.bucket("second target bucket")?,
        };
        r.finish()?;
        Ok(op)
    }

    fn serialize_payload(&self, buf: &mut Vec<u8>) {
        put_u64(buf, self.source.raw());
        put_u64(buf, self.target1.raw());
        put_u64(buf, self.target2.raw());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinBucketsOperation {
    pub serial: u64,
    pub source1: BucketId,
    pub source2: BucketId,
    pub target: BucketId,
}

impl JoinBucketsOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            source1: r.bucket("first source bucket")?,
            source2: r.bucket("second source bucket")?,
            target: r.bucket("target bucket")?,
        };
        r.finish()?;
        Ok(op)
    }

    fn serialize_payload(&self, buf: &mut Vec<u8>) {
        put_u64(buf, self.source1.raw());
        put_u64(buf, self.source2.raw());
        put_u64(buf, self.target.raw());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneRemovedDocumentsOperation {
    pub serial: u64,
    pub sub_db_id: u32,
    /// Local document ids whose remove history is dropped
    pub lids: Vec<u32>,
}

impl PruneRemovedDocumentsOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let sub_db_id = r.u32("sub db id")?;
        let count = r.u32("lid count")? as usize;
        if count > (data.len() / 4) {
            return Err(r.error(format!("lid count {} exceeds payload size", count)));
        }
        let mut lids = Vec::with_capacity(count);
        for _ in 0..count {
            lids.push(r.u32("lid")?);
        }
        r.finish()?;
        Ok(Self {
            serial,
            sub_db_id,
            lids,
        })
    }

    fn serialize_payload(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.sub_db_id);
        put_u32(buf, self.lids.len() as u32);
        for lid in &self.lids {
            put_u32(buf, *lid);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpoolerReplayStartOperation {
    pub serial: u64,
    pub spooler_serial: u64,
}

impl SpoolerReplayStartOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            spooler_serial: r.u64("spooler serial")?,
        };
        r.finish()?;
        Ok(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpoolerReplayCompleteOperation {
    pub serial: u64,
    pub spooler_serial: u64,
}

impl SpoolerReplayCompleteOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            spooler_serial: r.u64("spooler serial")?,
        };
        r.finish()?;
        Ok(op)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOperation {
    pub serial: u64,
    pub bucket_id: BucketId,
    pub timestamp: u64,
    pub document: Document,
    pub source_db: u32,
    pub source_lid: u32,
    pub target_db: u32,
    pub target_lid: u32,
}

impl MoveOperation {
    pub fn deserialize(serial: u64, data: &[u8], repo: &DocumentTypeRepo) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            bucket_id: r.bucket("bucket id")?,
            timestamp: r.u64("timestamp")?,
            document: r.document(repo)?,
            source_db: r.u32("source db")?,
            source_lid: r.u32("source lid")?,
            target_db: r.u32("target db")?,
            target_lid: r.u32("target lid")?,
        };
        r.finish()?;
        Ok(op)
    }

    fn serialize_payload(&self, buf: &mut Vec<u8>) {
        put_u64(buf, self.bucket_id.raw());
        put_u64(buf, self.timestamp);
        put_document(buf, &self.document);
        put_u32(buf, self.source_db);
        put_u32(buf, self.source_lid);
        put_u32(buf, self.target_db);
        put_u32(buf, self.target_lid);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateBucketOperation {
    pub serial: u64,
    pub bucket_id: BucketId,
}

impl CreateBucketOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            bucket_id: r.bucket("bucket id")?,
        };
        r.finish()?;
        Ok(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactLidSpaceOperation {
    pub serial: u64,
    pub sub_db_id: u32,
    pub lid_limit: u32,
}

impl CompactLidSpaceOperation {
    pub fn deserialize(serial: u64, data: &[u8]) -> ReplayResult<Self> {
        let mut r = PayloadReader::new(serial, data);
        let op = Self {
            serial,
            sub_db_id: r.u32("sub db id")?,
            lid_limit: r.u32("lid limit")?,
        };
        r.finish()?;
        Ok(op)
    }

    fn serialize_payload(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.sub_db_id);
        put_u32(buf, self.lid_limit);
    }
}

/// The closed set of operations a log entry can carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOperation {
    Put(PutOperation),
    Remove(RemoveOperation),
    Update(UpdateOperation),
    Noop(NoopOperation),
    NewConfig(NewConfigOperation),
    WipeHistory(WipeHistoryOperation),
    DeleteBucket(DeleteBucketOperation),
    SplitBucket(SplitBucketOperation),
    JoinBuckets(JoinBucketsOperation),
    PruneRemovedDocuments(PruneRemovedDocumentsOperation),
    SpoolerReplayStart(SpoolerReplayStartOperation),
    SpoolerReplayComplete(SpoolerReplayCompleteOperation),
    Move(MoveOperation),
    CreateBucket(CreateBucketOperation),
    CompactLidSpace(CompactLidSpaceOperation),
}

impl FeedOperation {
    /// Serial number of the entry this operation came from
    pub fn serial(&self) -> u64 {
        match self {
            FeedOperation::Put(op) => op.serial,
            FeedOperation::Remove(op) => op.serial,
            FeedOperation::Update(op) => op.serial,
            FeedOperation::Noop(op) => op.serial,
            FeedOperation::NewConfig(op) => op.serial,
            FeedOperation::WipeHistory(op) => op.serial,
            FeedOperation::DeleteBucket(op) => op.serial,
            FeedOperation::SplitBucket(op) => op.serial,
            FeedOperation::JoinBuckets(op) => op.serial,
            FeedOperation::PruneRemovedDocuments(op) => op.serial,
            FeedOperation::SpoolerReplayStart(op) => op.serial,
            FeedOperation::SpoolerReplayComplete(op) => op.serial,
            FeedOperation::Move(op) => op.serial,
            FeedOperation::CreateBucket(op) => op.serial,
            FeedOperation::CompactLidSpace(op) => op.serial,
        }
    }

    /// Tag this operation is written under
    pub fn entry_type(&self) -> EntryType {
        match self {
            FeedOperation::Put(_) => EntryType::Put,
            FeedOperation::Remove(_) => EntryType::Remove,
            FeedOperation::Update(op) => op.entry_type(),
            FeedOperation::Noop(_) => EntryType::Noop,
            FeedOperation::NewConfig(_) => EntryType::NewConfig,
            FeedOperation::WipeHistory(_) => EntryType::WipeHistory,
            FeedOperation::DeleteBucket(_) => EntryType::DeleteBucket,
            FeedOperation::SplitBucket(_) => EntryType::SplitBucket,
            FeedOperation::JoinBuckets(_) => EntryType::JoinBuckets,
            FeedOperation::PruneRemovedDocuments(_) => EntryType::PruneRemovedDocuments,
            FeedOperation::SpoolerReplayStart(_) => EntryType::SpoolerReplayStart,
            FeedOperation::SpoolerReplayComplete(_) => EntryType::SpoolerReplayComplete,
            FeedOperation::Move(_) => EntryType::Move,
            FeedOperation::CreateBucket(_) => EntryType::CreateBucket,
            FeedOperation::CompactLidSpace(_) => EntryType::CompactLidSpace,
        }
    }

    /// Encode as a log entry.
    ///
    /// New-config entries are encoded without a configuration blob; use
    /// [`NewConfigOperation::entry_with_config`] to attach one.
    pub fn to_entry(&self) -> Entry {
        let mut payload = Vec::new();
        match self {
            FeedOperation::Put(op) => op.serialize_payload(&mut payload),
            FeedOperation::Remove(op) => op.serialize_payload(&mut payload),
            FeedOperation::Update(op) => op.serialize_payload(&mut payload),
            FeedOperation::Noop(_) | FeedOperation::NewConfig(_) => {}
            FeedOperation::WipeHistory(op) => op.serialize_payload(&mut payload),
            FeedOperation::DeleteBucket(op) => put_u64(&mut payload, op.bucket_id.raw()),
            FeedOperation::SplitBucket(op) => op.serialize_payload(&mut payload),
            FeedOperation::JoinBuckets(op) => op.serialize_payload(&mut payload),
            FeedOperation::PruneRemovedDocuments(op) => op.serialize_payload(&mut payload),
            FeedOperation::SpoolerReplayStart(op) => put_u64(&mut payload, op.spooler_serial),
            FeedOperation::SpoolerReplayComplete(op) => put_u64(&mut payload, op.spooler_serial),
            FeedOperation::Move(op) => op.serialize_payload(&mut payload),
            FeedOperation::CreateBucket(op) => put_u64(&mut payload, op.bucket_id.raw()),
            FeedOperation::CompactLidSpace(op) => op.serialize_payload(&mut payload),
        }
        Entry::new(self.serial(), self.entry_type().as_u32(), payload)
    }
}
