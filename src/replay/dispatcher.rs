//! Entry to handler dispatch
//!
//! Decoding needs context owned by the handler: the config store consumes
//! new-config blobs, and document payloads are checked against the active
//! feed view's document types. Dispatch is a single exhaustive match, so a
//! new operation cannot be added without a handler method for it.

use std::sync::Arc;

use super::entry::Entry;
use super::errors::{ReplayError, ReplayResult};
use super::operation::{
    CompactLidSpaceOperation, CreateBucketOperation, DeleteBucketOperation, DocumentTypeRepo,
    EntryType, FeedOperation, JoinBucketsOperation, MoveOperation, NewConfigOperation,
    NewConfigStreamHandler, NoopOperation, PruneRemovedDocumentsOperation, PutOperation,
    RemoveOperation, SpoolerReplayCompleteOperation, SpoolerReplayStartOperation,
    SplitBucketOperation, UpdateOperation, WipeHistoryOperation,
};

/// One method per operation, plus the decoding context.
pub trait ReplayPacketHandler: Send + Sync {
    fn replay_put(&self, op: &PutOperation) -> ReplayResult<()>;
    fn replay_remove(&self, op: &RemoveOperation) -> ReplayResult<()>;
    fn replay_update(&self, op: &UpdateOperation) -> ReplayResult<()>;
    fn replay_noop(&self, op: &NoopOperation) -> ReplayResult<()>;
    fn replay_new_config(&self, op: &NewConfigOperation) -> ReplayResult<()>;
    fn replay_wipe_history(&self, op: &WipeHistoryOperation) -> ReplayResult<()>;
    fn replay_delete_bucket(&self, op: &DeleteBucketOperation) -> ReplayResult<()>;
    fn replay_split_bucket(&self, op: &SplitBucketOperation) -> ReplayResult<()>;
    fn replay_join_buckets(&self, op: &JoinBucketsOperation) -> ReplayResult<()>;
    fn replay_prune_removed_documents(&self, op: &PruneRemovedDocumentsOperation)
        -> ReplayResult<()>;
    fn replay_spooler_replay_start(&self, op: &SpoolerReplayStartOperation) -> ReplayResult<()>;
    fn replay_spooler_replay_complete(
        &self,
        op: &SpoolerReplayCompleteOperation,
    ) -> ReplayResult<()>;
    fn replay_move(&self, op: &MoveOperation) -> ReplayResult<()>;
    fn replay_create_bucket(&self, op: &CreateBucketOperation) -> ReplayResult<()>;
    fn replay_compact_lid_space(&self, op: &CompactLidSpaceOperation) -> ReplayResult<()>;

    /// Consumer of new-config payloads
    fn new_config_stream_handler(&self) -> &dyn NewConfigStreamHandler;

    /// Document types used to decode document-bearing payloads
    fn deserialize_repo(&self) -> ReplayResult<Arc<DocumentTypeRepo>>;
}

/// Decode an entry into its operation.
///
/// Unknown tags are a fatal decode error.
pub fn decode_entry(
    entry: &Entry,
    handler: &dyn ReplayPacketHandler,
) -> ReplayResult<FeedOperation> {
    let serial = entry.serial();
    let data = entry.payload();
    let entry_type = EntryType::from_u32(entry.entry_type())
        .ok_or_else(|| ReplayError::unknown_entry_type(serial, entry.entry_type()))?;

    let op = match entry_type {
        EntryType::Put => {
            let repo = handler.deserialize_repo().map_err(|e| e.with_serial(serial))?;
            FeedOperation::Put(PutOperation::deserialize(serial, data, &repo)?)
        }
        EntryType::Remove => FeedOperation::Remove(RemoveOperation::deserialize(serial, data)?),
        EntryType::Update => {
            let repo = handler.deserialize_repo().map_err(|e| e.with_serial(serial))?;
            FeedOperation::Update(UpdateOperation::deserialize(serial, data, &repo)?)
        }
        EntryType::Update42 => {
            let repo = handler.deserialize_repo().map_err(|e| e.with_serial(serial))?;
            FeedOperation::Update(UpdateOperation::deserialize_legacy(serial, data, &repo)?)
        }
        EntryType::Noop => FeedOperation::Noop(NoopOperation::deserialize(serial, data)?),
        EntryType::NewConfig => FeedOperation::NewConfig(NewConfigOperation::deserialize(
            serial,
            data,
            handler.new_config_stream_handler(),
        )?),
        EntryType::WipeHistory => {
            FeedOperation::WipeHistory(WipeHistoryOperation::deserialize(serial, data)?)
        }
        EntryType::DeleteBucket => {
            FeedOperation::DeleteBucket(DeleteBucketOperation::deserialize(serial, data)?)
        }
        EntryType::SplitBucket => {
            FeedOperation::SplitBucket(SplitBucketOperation::deserialize(serial, data)?)
        }
        EntryType::JoinBuckets => {
            FeedOperation::JoinBuckets(JoinBucketsOperation::deserialize(serial, data)?)
        }
        EntryType::PruneRemovedDocuments => FeedOperation::PruneRemovedDocuments(
            PruneRemovedDocumentsOperation::deserialize(serial, data)?,
        ),
        EntryType::SpoolerReplayStart => FeedOperation::SpoolerReplayStart(
            SpoolerReplayStartOperation::deserialize(serial, data)?,
        ),
        EntryType::SpoolerReplayComplete => FeedOperation::SpoolerReplayComplete(
            SpoolerReplayCompleteOperation::deserialize(serial, data)?,
        ),
        EntryType::Move => {
            let repo = handler.deserialize_repo().map_err(|e| e.with_serial(serial))?;
            FeedOperation::Move(MoveOperation::deserialize(serial, data, &repo)?)
        }
        EntryType::CreateBucket => {
            FeedOperation::CreateBucket(CreateBucketOperation::deserialize(serial, data)?)
        }
        EntryType::CompactLidSpace => {
            FeedOperation::CompactLidSpace(CompactLidSpaceOperation::deserialize(serial, data)?)
        }
    };
    Ok(op)
}

/// Invoke the single handler method matching `op`.
pub fn dispatch_operation(
    op: &FeedOperation,
    handler: &dyn ReplayPacketHandler,
) -> ReplayResult<()> {
    match op {
        FeedOperation::Put(op) => handler.replay_put(op),
        FeedOperation::Remove(op) => handler.replay_remove(op),
        FeedOperation::Update(op) => handler.replay_update(op),
        FeedOperation::Noop(op) => handler.replay_noop(op),
        FeedOperation::NewConfig(op) => handler.replay_new_config(op),
        FeedOperation::WipeHistory(op) => handler.replay_wipe_history(op),
        FeedOperation::DeleteBucket(op) => handler.replay_delete_bucket(op),
        FeedOperation::SplitBucket(op) => handler.replay_split_bucket(op),
        FeedOperation::JoinBuckets(op) => handler.replay_join_buckets(op),
        FeedOperation::PruneRemovedDocuments(op) => handler.replay_prune_removed_documents(op),
        FeedOperation::SpoolerReplayStart(op) => handler.replay_spooler_replay_start(op),
        FeedOperation::SpoolerReplayComplete(op) => handler.replay_spooler_replay_complete(op),
        FeedOperation::Move(op) => handler.replay_move(op),
        FeedOperation::CreateBucket(op) => handler.replay_create_bucket(op),
        FeedOperation::CompactLidSpace(op) => handler.replay_compact_lid_space(op),
    }
}

/// Decodes entries and hands them to a handler
pub struct ReplayPacketDispatcher<'a> {
    handler: &'a dyn ReplayPacketHandler,
}

impl<'a> ReplayPacketDispatcher<'a> {
    pub fn new(handler: &'a dyn ReplayPacketHandler) -> Self {
        Self { handler }
    }

    /// Decode and dispatch one entry, returning the operation's tag
    pub fn replay_entry(&self, entry: &Entry) -> ReplayResult<EntryType> {
        let op = decode_entry(entry, self.handler)?;
        dispatch_operation(&op, self.handler)?;
        Ok(op.entry_type())
    }
}
