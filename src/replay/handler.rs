//! Replay handler: routes decoded operations to collaborators
//!
//! | Operation               | Collaborator                                  |
//! |-------------------------|-----------------------------------------------|
//! | put/remove/update       | active feed view                              |
//! | delete bucket / move    | active feed view                              |
//! | prune / compact lids    | active feed view                              |
//! | split / join buckets    | bucket db handler                             |
//! | new config              | replay config notifier                        |
//! | wipe history            | config store, then replay config notifier     |
//! | noop / spooler / create | none                                          |

use std::sync::Arc;

use super::dispatcher::ReplayPacketHandler;
use super::errors::{ReplayError, ReplayResult};
use super::feed::{BucketDbHandler, FeedConfigStore, FeedView, FeedViewSlot, ReplayConfigNotifier};
use super::operation::{
    CompactLidSpaceOperation, CreateBucketOperation, DeleteBucketOperation, DocumentTypeRepo,
    JoinBucketsOperation, MoveOperation, NewConfigOperation, NewConfigStreamHandler,
    NoopOperation, PruneRemovedDocumentsOperation, PutOperation, RemoveOperation,
    SpoolerReplayCompleteOperation, SpoolerReplayStartOperation, SplitBucketOperation,
    UpdateOperation, WipeHistoryOperation,
};
use crate::observability::{Event, Logger};

/// Forwards replayed operations to their collaborators.
///
/// Holds the feed view slot, never a view; the slot is read on every
/// operation so a swap between entries is honoured.
pub struct TransactionLogReplayHandler {
    feed_view: FeedViewSlot,
    bucket_db: Arc<dyn BucketDbHandler>,
    replay_config: Arc<dyn ReplayConfigNotifier>,
    config_store: Arc<dyn FeedConfigStore>,
}

impl TransactionLogReplayHandler {
    pub fn new(
        feed_view: FeedViewSlot,
        bucket_db: Arc<dyn BucketDbHandler>,
        replay_config: Arc<dyn ReplayConfigNotifier>,
        config_store: Arc<dyn FeedConfigStore>,
    ) -> Self {
        Self {
            feed_view,
            bucket_db,
            replay_config,
            config_store,
        }
    }

    /// The slot this handler reads the feed view from
    pub fn feed_view_slot(&self) -> &FeedViewSlot {
        &self.feed_view
    }

    fn feed_view(&self, operation: &str) -> ReplayResult<Arc<dyn FeedView>> {
        self.feed_view
            .current()
            .ok_or_else(|| ReplayError::no_active_feed_view(operation))
    }
}

impl NewConfigStreamHandler for TransactionLogReplayHandler {
    fn deserialize_config(&self, serial: u64, config: &[u8]) -> ReplayResult<()> {
        self.config_store.deserialize_config(serial, config)
    }
}

impl ReplayPacketHandler for TransactionLogReplayHandler {
    fn replay_put(&self, op: &PutOperation) -> ReplayResult<()> {
        self.feed_view("put")
            .and_then(|view| view.handle_put(op))
            .map_err(|e| e.with_serial(op.serial))
    }

    fn replay_remove(&self, op: &RemoveOperation) -> ReplayResult<()> {
        self.feed_view("remove")
            .and_then(|view| view.handle_remove(op))
            .map_err(|e| e.with_serial(op.serial))
    }

    fn replay_update(&self, op: &UpdateOperation) -> ReplayResult<()> {
        self.feed_view("update")
            .and_then(|view| view.handle_update(op))
            .map_err(|e| e.with_serial(op.serial))
    }

    fn replay_noop(&self, _op: &NoopOperation) -> ReplayResult<()> {
        Ok(())
    }

    fn replay_new_config(&self, op: &NewConfigOperation) -> ReplayResult<()> {
        self.replay_config
            .replay_config(op.serial)
            .map_err(|e| e.with_serial(op.serial))
    }

    fn replay_wipe_history(&self, op: &WipeHistoryOperation) -> ReplayResult<()> {
        let serial = op.serial.to_string();
        let limit = op.wipe_time_limit_display();
        Logger::debug(
            Event::ReplayWipeHistory.as_str(),
            &[("serial", serial.as_str()), ("wipe_time_limit", limit.as_str())],
        );
        self.config_store
            .save_wipe_history_config(op.serial, op.wipe_time_limit)
            .and_then(|()| {
                self.replay_config
                    .replay_wipe_history(op.serial, op.wipe_time_limit)
            })
            .map_err(|e| e.with_serial(op.serial))
    }

    fn replay_delete_bucket(&self, op: &DeleteBucketOperation) -> ReplayResult<()> {
        self.feed_view("delete bucket")
            .and_then(|view| view.handle_delete_bucket(op))
            .map_err(|e| e.with_serial(op.serial))
    }

    fn replay_split_bucket(&self, op: &SplitBucketOperation) -> ReplayResult<()> {
        self.bucket_db
            .handle_split(op.serial, op.source, op.target1, op.target2)
            .map_err(|e| e.with_serial(op.serial))
    }

    fn replay_join_buckets(&self, op: &JoinBucketsOperation) -> ReplayResult<()> {
        self.bucket_db
            .handle_join(op.serial, op.source1, op.source2, op.target)
            .map_err(|e| e.with_serial(op.serial))
    }

    fn replay_prune_removed_documents(
        &self,
        op: &PruneRemovedDocumentsOperation,
    ) -> ReplayResult<()> {
        self.feed_view("prune removed documents")
            .and_then(|view| view.handle_prune_removed_documents(op))
            .map_err(|e| e.with_serial(op.serial))
    }

    fn replay_spooler_replay_start(&self, _op: &SpoolerReplayStartOperation) -> ReplayResult<()> {
        Ok(())
    }

    fn replay_spooler_replay_complete(
        &self,
        _op: &SpoolerReplayCompleteOperation,
    ) -> ReplayResult<()> {
        Ok(())
    }

    fn replay_move(&self, op: &MoveOperation) -> ReplayResult<()> {
        self.feed_view("move")
            .and_then(|view| view.handle_move(op))
            .map_err(|e| e.with_serial(op.serial))
    }

    fn replay_create_bucket(&self, _op: &CreateBucketOperation) -> ReplayResult<()> {
        Ok(())
    }

    fn replay_compact_lid_space(&self, op: &CompactLidSpaceOperation) -> ReplayResult<()> {
        self.feed_view("compact lid space")
            .and_then(|view| view.handle_compact_lid_space(op))
            .map_err(|e| e.with_serial(op.serial))
    }

    fn new_config_stream_handler(&self) -> &dyn NewConfigStreamHandler {
        self
    }

    fn deserialize_repo(&self) -> ReplayResult<Arc<DocumentTypeRepo>> {
        self.feed_view("document decode")
            .map(|view| view.document_type_repo())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::errors::ReplayErrorCode;
    use crate::replay::operation::BucketId;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<String>>,
        fail_store: bool,
    }

    impl Journal {
        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl BucketDbHandler for Journal {
        fn handle_split(
            &self,
            serial: u64,
            source: BucketId,
            target1: BucketId,
            target2: BucketId,
        ) -> ReplayResult<()> {
            self.push(format!(
                "split:{}:{}:{}:{}",
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
            self.push(format!(
                "join:{}:{}:{}:{}",
                serial, source1.0, source2.0, target.0
            ));
            Ok(())
        }
    }

    impl ReplayConfigNotifier for Journal {
        fn replay_config(&self, serial: u64) -> ReplayResult<()> {
            self.push(format!("replay_config:{}", serial));
            Ok(())
        }

        fn replay_wipe_history(&self, serial: u64, wipe_time_limit: u64) -> ReplayResult<()> {
            self.push(format!("replay_wipe_history:{}:{}", serial, wipe_time_limit));
            Ok(())
        }
    }

    impl FeedConfigStore for Journal {
        fn save_wipe_history_config(&self, serial: u64, wipe_time_limit: u64) -> ReplayResult<()> {
            if self.fail_store {
                return Err(ReplayError::collaborator_failed("config store", "disk full"));
            }
            self.push(format!("save_wipe_history:{}:{}", serial, wipe_time_limit));
            Ok(())
        }

        fn deserialize_config(&self, serial: u64, config: &[u8]) -> ReplayResult<()> {
            self.push(format!("deserialize_config:{}:{}", serial, config.len()));
            Ok(())
        }
    }

    fn handler(journal: Arc<Journal>) -> TransactionLogReplayHandler {
        TransactionLogReplayHandler::new(
            FeedViewSlot::new(),
            journal.clone(),
            journal.clone(),
            journal,
        )
    }

    #[test]
    fn test_wipe_history_saves_then_notifies() {
        let journal = Arc::new(Journal::default());
        let h = handler(journal.clone());

        h.replay_wipe_history(&WipeHistoryOperation {
            serial: 9,
            wipe_time_limit: 1234,
        })
        .unwrap();

        assert_eq!(
            journal.calls(),
            vec!["save_wipe_history:9:1234", "replay_wipe_history:9:1234"]
        );
    }

    #[test]
    fn test_wipe_history_store_failure_skips_notify() {
        let journal = Arc::new(Journal {
            fail_store: true,
            ..Journal::default()
        });
        let h = handler(journal.clone());

        let err = h
            .replay_wipe_history(&WipeHistoryOperation {
                serial: 9,
                wipe_time_limit: 1,
            })
            .unwrap_err();

        assert_eq!(err.code(), ReplayErrorCode::ReplayCollaboratorFailed);
        assert_eq!(err.serial(), Some(9));
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn test_split_and_join_go_to_bucket_db() {
        let journal = Arc::new(Journal::default());
        let h = handler(journal.clone());

        h.replay_split_bucket(&SplitBucketOperation {
            serial: 1,
            source: BucketId(1),
            target1: BucketId(2),
            target2: BucketId(3),
        })
        .unwrap();
        h.replay_join_buckets(&JoinBucketsOperation {
            serial: 2,
            source1: BucketId(2),
            source2: BucketId(3),
            target: BucketId(1),
        })
        .unwrap();

        assert_eq!(journal.calls(), vec!["split:1:1:2:3", "join:2:2:3:1"]);
    }

    #[test]
    fn test_new_config_notifies_and_streams_to_store() {
        let journal = Arc::new(Journal::default());
        let h = handler(journal.clone());

        h.new_config_stream_handler()
            .deserialize_config(4, b"abc")
            .unwrap();
        h.replay_new_config(&NewConfigOperation { serial: 4 }).unwrap();

        assert_eq!(
            journal.calls(),
            vec!["deserialize_config:4:3", "replay_config:4"]
        );
    }

    #[test]
    fn test_ignored_operations_touch_nothing() {
        let journal = Arc::new(Journal::default());
        let h = handler(journal.clone());

        h.replay_noop(&NoopOperation { serial: 1 }).unwrap();
        h.replay_spooler_replay_start(&SpoolerReplayStartOperation {
            serial: 2,
            spooler_serial: 10,
        })
        .unwrap();
        h.replay_spooler_replay_complete(&SpoolerReplayCompleteOperation {
            serial: 3,
            spooler_serial: 10,
        })
        .unwrap();
        h.replay_create_bucket(&CreateBucketOperation {
            serial: 4,
            bucket_id: BucketId(5),
        })
        .unwrap();

        assert!(journal.calls().is_empty());
    }

    #[test]
    fn test_document_operation_without_feed_view() {
        let journal = Arc::new(Journal::default());
        let h = handler(journal);

        let err = h
            .replay_delete_bucket(&DeleteBucketOperation {
                serial: 6,
                bucket_id: BucketId(1),
            })
            .unwrap_err();
        assert_eq!(err.code(), ReplayErrorCode::ReplayNoActiveFeedView);
        assert_eq!(err.serial(), Some(6));

        let err = h.deserialize_repo().unwrap_err();
        assert!(err.code().is_invariant_violation());
    }
}
