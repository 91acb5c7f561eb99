//! Recording collaborators for offline replay
//!
//! Stand in for the feed view, bucket db, config notifier and config store
//! when a packet is replayed from the command line. Every call is logged and
//! kept in a shared journal.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::observability::Logger;
use crate::replay::{
    BucketDbHandler, BucketId, CompactLidSpaceOperation, DeleteBucketOperation, DocumentTypeRepo,
    FeedConfigStore, FeedView, MoveOperation, PruneRemovedDocumentsOperation, PutOperation,
    RemoveOperation, ReplayConfigNotifier, ReplayResult, UpdateOperation,
};

/// One collaborator call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollaboratorCall {
    pub collaborator: &'static str,
    pub operation: &'static str,
    pub serial: u64,
}

/// Shared, ordered record of collaborator calls
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<CollaboratorCall>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, collaborator: &'static str, operation: &'static str, serial: u64) {
        let serial_str = serial.to_string();
        Logger::debug(
            "REPLAY_COLLABORATOR_CALL",
            &[
                ("collaborator", collaborator),
                ("operation", operation),
                ("serial", serial_str.as_str()),
            ],
        );
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(CollaboratorCall {
                collaborator,
                operation,
                serial,
            });
    }

    /// All calls, oldest first
    pub fn calls(&self) -> Vec<CollaboratorCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of calls made to `collaborator`
    pub fn count(&self, collaborator: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|c| c.collaborator == collaborator)
            .count()
    }
}

/// Feed view that accepts every operation
pub struct RecordingFeedView {
    journal: CallJournal,
    repo: Arc<DocumentTypeRepo>,
}

impl RecordingFeedView {
    pub fn new(journal: CallJournal, repo: DocumentTypeRepo) -> Self {
        Self {
            journal,
            repo: Arc::new(repo),
        }
    }
}

const FEED_VIEW: &str = "feed_view";

impl FeedView for RecordingFeedView {
    fn handle_put(&self, op: &PutOperation) -> ReplayResult<()> {
        self.journal.record(FEED_VIEW, "put", op.serial);
        Ok(())
    }

    fn handle_remove(&self, op: &RemoveOperation) -> ReplayResult<()> {
        self.journal.record(FEED_VIEW, "remove", op.serial);
        Ok(())
    }

    fn handle_update(&self, op: &UpdateOperation) -> ReplayResult<()> {
        self.journal.record(FEED_VIEW, "update", op.serial);
        Ok(())
    }

    fn handle_delete_bucket(&self, op: &DeleteBucketOperation) -> ReplayResult<()> {
        self.journal.record(FEED_VIEW, "delete_bucket", op.serial);
        Ok(())
    }

    fn handle_move(&self, op: &MoveOperation) -> ReplayResult<()> {
        self.journal.record(FEED_VIEW, "move", op.serial);
        Ok(())
    }

    fn handle_prune_removed_documents(
        &self,
        op: &PruneRemovedDocumentsOperation,
    ) -> ReplayResult<()> {
        self.journal
            .record(FEED_VIEW, "prune_removed_documents", op.serial);
        Ok(())
    }

    fn handle_compact_lid_space(&self, op: &CompactLidSpaceOperation) -> ReplayResult<()> {
        self.journal.record(FEED_VIEW, "compact_lid_space", op.serial);
        Ok(())
    }

    fn document_type_repo(&self) -> Arc<DocumentTypeRepo> {
        Arc::clone(&self.repo)
    }
}

/// Bucket db, config notifier and config store in one
pub struct RecordingBackend {
    journal: CallJournal,
}

impl RecordingBackend {
    pub fn new(journal: CallJournal) -> Self {
        Self { journal }
    }
}

impl BucketDbHandler for RecordingBackend {
    fn handle_split(
        &self,
        serial: u64,
        _source: BucketId,
        _target1: BucketId,
        _target2: BucketId,
    ) -> ReplayResult<()> {
        self.journal.record("bucket_db", "split", serial);
        Ok(())
    }

    fn handle_join(
        &self,
        serial: u64,
        _source1: BucketId,
        _source2: BucketId,
        _target: BucketId,
    ) -> ReplayResult<()> {
        self.journal.record("bucket_db", "join", serial);
        Ok(())
    }
}

impl ReplayConfigNotifier for RecordingBackend {
    fn replay_config(&self, serial: u64) -> ReplayResult<()> {
        self.journal.record("replay_config", "config", serial);
        Ok(())
    }

    fn replay_wipe_history(&self, serial: u64, _wipe_time_limit: u64) -> ReplayResult<()> {
        self.journal.record("replay_config", "wipe_history", serial);
        Ok(())
    }
}

impl FeedConfigStore for RecordingBackend {
    fn save_wipe_history_config(&self, serial: u64, _wipe_time_limit: u64) -> ReplayResult<()> {
        self.journal
            .record("config_store", "save_wipe_history", serial);
        Ok(())
    }

    fn deserialize_config(&self, serial: u64, _config: &[u8]) -> ReplayResult<()> {
        self.journal
            .record("config_store", "deserialize_config", serial);
        Ok(())
    }
}
