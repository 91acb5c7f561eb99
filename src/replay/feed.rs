//! Downstream collaborators of the replay engine
//!
//! The replay handler forwards every operation to exactly one of these. All
//! of them are shared with the rest of the feed pipeline and outlive the
//! replay state that references them.
//!
//! The feed view is reached through a [`FeedViewSlot`], which another actor
//! may repoint at any time. The handler reads the slot once per operation
//! and never keeps the view between operations.

use std::fmt;
use std::sync::{Arc, RwLock};

use super::errors::ReplayResult;
use super::operation::{
    BucketId, CompactLidSpaceOperation, DeleteBucketOperation, DocumentTypeRepo, MoveOperation,
    PruneRemovedDocumentsOperation, PutOperation, RemoveOperation, UpdateOperation,
};

/// The live indexing/storage target for document operations.
///
/// Replayed operations carry no originating client context; there is
/// nobody to acknowledge.
pub trait FeedView: Send + Sync {
    fn handle_put(&self, op: &PutOperation) -> ReplayResult<()>;
    fn handle_remove(&self, op: &RemoveOperation) -> ReplayResult<()>;
    fn handle_update(&self, op: &UpdateOperation) -> ReplayResult<()>;
    fn handle_delete_bucket(&self, op: &DeleteBucketOperation) -> ReplayResult<()>;
    fn handle_move(&self, op: &MoveOperation) -> ReplayResult<()>;
    fn handle_prune_removed_documents(&self, op: &PruneRemovedDocumentsOperation)
        -> ReplayResult<()>;
    fn handle_compact_lid_space(&self, op: &CompactLidSpaceOperation) -> ReplayResult<()>;

    /// Document types this view currently accepts
    fn document_type_repo(&self) -> Arc<DocumentTypeRepo>;
}

/// Bucket-distribution metadata owner
pub trait BucketDbHandler: Send + Sync {
    fn handle_split(
        &self,
        serial: u64,
        source: BucketId,
        target1: BucketId,
        target2: BucketId,
    ) -> ReplayResult<()>;

    fn handle_join(
        &self,
        serial: u64,
        source1: BucketId,
        source2: BucketId,
        target: BucketId,
    ) -> ReplayResult<()>;
}

/// Told about configuration history as it is replayed
pub trait ReplayConfigNotifier: Send + Sync {
    fn replay_config(&self, serial: u64) -> ReplayResult<()>;
    fn replay_wipe_history(&self, serial: u64, wipe_time_limit: u64) -> ReplayResult<()>;
}

/// Persistent configuration history
pub trait FeedConfigStore: Send + Sync {
    /// Persist a history wipe at `serial`
    fn save_wipe_history_config(&self, serial: u64, wipe_time_limit: u64) -> ReplayResult<()>;

    /// Consume the configuration blob carried by a new-config entry
    fn deserialize_config(&self, serial: u64, config: &[u8]) -> ReplayResult<()>;
}

/// Shared, repointable reference to the active feed view.
///
/// Clones share the same slot.
#[derive(Clone, Default)]
pub struct FeedViewSlot {
    inner: Arc<RwLock<Option<Arc<dyn FeedView>>>>,
}

impl FeedViewSlot {
    /// Empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pointing at `view`
    pub fn with_view(view: Arc<dyn FeedView>) -> Self {
        let slot = Self::new();
        slot.set(view);
        slot
    }

    /// Point the slot at `view`, returning the previous view
    pub fn set(&self, view: Arc<dyn FeedView>) -> Option<Arc<dyn FeedView>> {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.replace(view)
    }

    /// Empty the slot, returning the previous view
    pub fn clear(&self) -> Option<Arc<dyn FeedView>> {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.take()
    }

    /// The view installed right now
    pub fn current(&self) -> Option<Arc<dyn FeedView>> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }
}

impl fmt::Debug for FeedViewSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedViewSlot")
            .field("is_set", &self.is_set())
            .finish()
    }
}
