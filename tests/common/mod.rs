//! Shared fixtures for replay integration tests
//!
//! Every collaborator writes a line into one journal so tests can assert on
//! the global order of calls across collaborators.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tlreplay::replay::{
    BucketDbHandler, BucketId, CompactLidSpaceOperation, DeleteBucketOperation, Document,
    DocumentTypeRepo, Entry, FeedConfigStore, FeedOperation, FeedState, FeedView, FeedViewSlot,
    MoveOperation, Packet, PacketResult, PacketWrapper, PruneRemovedDocumentsOperation,
    PutOperation, RemoveOperation, ReplayConfigNotifier, ReplayError, ReplayProgress,
    ReplayResult, ReplayTransactionLogState, SingleThreadExecutor, UpdateOperation,
};

#[derive(Clone, Default)]
pub struct Journal {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn push(&self, line: String) {
        self.lines.lock().unwrap().push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

/// Feed view that records calls under its label
pub struct RecordingView {
    label: &'static str,
    journal: Journal,
}

impl RecordingView {
    pub fn new(label: &'static str, journal: Journal) -> Arc<Self> {
        Arc::new(Self { label, journal })
    }

    fn record(&self, op: &str, serial: u64) -> ReplayResult<()> {
        self.journal
            .push(format!("view[{}].{}({})", self.label, op, serial));
        Ok(())
    }
}

impl FeedView for RecordingView {
    fn handle_put(&self, op: &PutOperation) -> ReplayResult<()> {
        self.record("put", op.serial)
    }
    fn handle_remove(&self, op: &RemoveOperation) -> ReplayResult<()> {
        self.record("remove", op.serial)
    }
    fn handle_update(&self, op: &UpdateOperation) -> ReplayResult<()> {
        self.record("update", op.serial)
    }
    fn handle_delete_bucket(&self, op: &DeleteBucketOperation) -> ReplayResult<()> {
        self.record("delete_bucket", op.serial)
    }
    fn handle_move(&self, op: &MoveOperation) -> ReplayResult<()> {
        self.record("move", op.serial)
    }
    fn handle_prune_removed_documents(
        &self,
        op: &PruneRemovedDocumentsOperation,
    ) -> ReplayResult<()> {
        self.record("prune_removed_documents", op.serial)
    }
    fn handle_compact_lid_space(&self, op: &CompactLidSpaceOperation) -> ReplayResult<()> {
        self.record("compact_lid_space", op.serial)
    }
    fn document_type_repo(&self) -> Arc<DocumentTypeRepo> {
        Arc::new(DocumentTypeRepo::with_types(["music"]))
    }
}

/// Feed view that repoints the slot to `next` while handling a put
pub struct SwappingView {
    inner: Arc<RecordingView>,
    slot: FeedViewSlot,
    next: Arc<dyn FeedView>,
}

impl SwappingView {
    pub fn new(inner: Arc<RecordingView>, slot: FeedViewSlot, next: Arc<dyn FeedView>) -> Arc<Self> {
        Arc::new(Self { inner, slot, next })
    }
}

impl FeedView for SwappingView {
    fn handle_put(&self, op: &PutOperation) -> ReplayResult<()> {
        self.inner.handle_put(op)?;
        self.slot.set(Arc::clone(&self.next));
        Ok(())
    }
    fn handle_remove(&self, op: &RemoveOperation) -> ReplayResult<()> {
        self.inner.handle_remove(op)
    }
    fn handle_update(&self, op: &UpdateOperation) -> ReplayResult<()> {
        self.inner.handle_update(op)
    }
    fn handle_delete_bucket(&self, op: &DeleteBucketOperation) -> ReplayResult<()> {
        self.inner.handle_delete_bucket(op)
    }
    fn handle_move(&self, op: &MoveOperation) -> ReplayResult<()> {
        self.inner.handle_move(op)
    }
    fn handle_prune_removed_documents(
        &self,
        op: &PruneRemovedDocumentsOperation,
    ) -> ReplayResult<()> {
        self.inner.handle_prune_removed_documents(op)
    }
    fn handle_compact_lid_space(&self, op: &CompactLidSpaceOperation) -> ReplayResult<()> {
        self.inner.handle_compact_lid_space(op)
    }
    fn document_type_repo(&self) -> Arc<DocumentTypeRepo> {
        self.inner.document_type_repo()
    }
}

/// Feed view that panics on a put at `panic_at` and records everything else
pub struct PanickingView {
    inner: Arc<RecordingView>,
    panic_at: u64,
}

impl PanickingView {
    pub fn new(inner: Arc<RecordingView>, panic_at: u64) -> Arc<Self> {
        Arc::new(Self { inner, panic_at })
    }
}

impl FeedView for PanickingView {
    fn handle_put(&self, op: &PutOperation) -> ReplayResult<()> {
        if op.serial == self.panic_at {
            panic!("feed view crashed on put {}", op.serial);
        }
        self.inner.handle_put(op)
    }
    fn handle_remove(&self, op: &RemoveOperation) -> ReplayResult<()> {
        self.inner.handle_remove(op)
    }
    fn handle_update(&self, op: &UpdateOperation) -> ReplayResult<()> {
        self.inner.handle_update(op)
    }
    fn handle_delete_bucket(&self, op: &DeleteBucketOperation) -> ReplayResult<()> {
        self.inner.handle_delete_bucket(op)
    }
    fn handle_move(&self, op: &MoveOperation) -> ReplayResult<()> {
        self.inner.handle_move(op)
    }
    fn handle_prune_removed_documents(
        &self,
        op: &PruneRemovedDocumentsOperation,
    ) -> ReplayResult<()> {
        self.inner.handle_prune_removed_documents(op)
    }
    fn handle_compact_lid_space(&self, op: &CompactLidSpaceOperation) -> ReplayResult<()> {
        self.inner.handle_compact_lid_space(op)
    }
    fn document_type_repo(&self) -> Arc<DocumentTypeRepo> {
        self.inner.document_type_repo()
    }
}

/// Bucket db, config notifier and config store
#[derive(Default)]
pub struct RecordingBackend {
    pub journal: Journal,
    /// Split at this serial fails
    pub fail_split_at: Option<u64>,
}

impl RecordingBackend {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_split_at: None,
        }
    }
}

impl BucketDbHandler for RecordingBackend {
    fn handle_split(
        &self,
        serial: u64,
        source: BucketId,
        target1: BucketId,
        target2: BucketId,
    ) -> ReplayResult<()> {
        if self.fail_split_at == Some(serial) {
            return Err(ReplayError::collaborator_failed("bucket db", "split refused"));
        }
        self.journal.push(format!(
            "bucket_db.split({},{},{},{})",
            serial, source.0, target1.0, target2.0
        ));
        Ok(())
    }

    fn handle_join(
        &self,
        serial: u64,
        source1: BucketId,
        source2: BucketId,
        target: BucketId,
    ) -> ReplayResult<()> {
        self.journal.push(format!(
            "bucket_db.join({},{},{},{})",
            serial, source1.0, source2.0, target.0
        ));
        Ok(())
    }
}

impl ReplayConfigNotifier for RecordingBackend {
    fn replay_config(&self, serial: u64) -> ReplayResult<()> {
        self.journal.push(format!("replay_config.config({})", serial));
        Ok(())
    }

    fn replay_wipe_history(&self, serial: u64, wipe_time_limit: u64) -> ReplayResult<()> {
        self.journal.push(format!(
            "replay_config.wipe_history({},{})",
            serial, wipe_time_limit
        ));
        Ok(())
    }
}

impl FeedConfigStore for RecordingBackend {
    fn save_wipe_history_config(&self, serial: u64, wipe_time_limit: u64) -> ReplayResult<()> {
        self.journal.push(format!(
            "config_store.save_wipe_history({},{})",
            serial, wipe_time_limit
        ));
        Ok(())
    }

    fn deserialize_config(&self, serial: u64, config: &[u8]) -> ReplayResult<()> {
        self.journal.push(format!(
            "config_store.deserialize_config({},{})",
            serial,
            String::from_utf8_lossy(config)
        ));
        Ok(())
    }
}

/// A replay state wired to recording collaborators and a worker thread
pub struct Harness {
    pub journal: Journal,
    pub slot: FeedViewSlot,
    pub state: ReplayTransactionLogState,
    pub executor: SingleThreadExecutor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backend(|journal| RecordingBackend::new(journal))
    }

    pub fn with_backend(make: impl FnOnce(Journal) -> RecordingBackend) -> Self {
        let journal = Journal::default();
        let slot = FeedViewSlot::with_view(RecordingView::new("a", journal.clone()));
        let backend = Arc::new(make(journal.clone()));
        let state = ReplayTransactionLogState::new(
            "music",
            slot.clone(),
            backend.clone(),
            backend.clone(),
            backend,
        );
        Self {
            journal,
            slot,
            state,
            executor: SingleThreadExecutor::new("tlreplay-test").unwrap(),
        }
    }

    /// Schedule a packet without waiting for it
    pub fn submit(&self, packet: Packet, progress: Option<Arc<ReplayProgress>>) -> Arc<PacketWrapper> {
        let wrapper = PacketWrapper::shared(packet, progress);
        self.state
            .receive(Arc::clone(&wrapper), &self.executor)
            .unwrap();
        wrapper
    }

    /// Replay a packet and wait for its result
    pub fn replay(&self, packet: Packet, progress: Option<Arc<ReplayProgress>>) -> PacketResult {
        self.submit(packet, progress).wait()
    }
}

pub fn put(serial: u64) -> Entry {
    FeedOperation::Put(PutOperation {
        serial,
        bucket_id: BucketId(1),
        timestamp: serial,
        document: Document::new("music", format!("id:ns:music::{}", serial), b"{}".to_vec()),
    })
    .to_entry()
}
