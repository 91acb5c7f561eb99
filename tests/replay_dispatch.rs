//! Replay Dispatch Tests
//!
//! Tests for:
//! - Routing of every entry type to exactly one collaborator
//! - Ignored entry types
//! - Feed view swaps between entries
//! - Missing feed view
//! - Collaborator failures and panics
//!
//! Each test drives packets through a `ReplayTransactionLogState` on a
//! worker thread and inspects the shared call journal.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{put, Harness, PanickingView, RecordingBackend, RecordingView, SwappingView};
use tlreplay::replay::{
    BucketId, CompactLidSpaceOperation, CreateBucketOperation, DeleteBucketOperation, Document,
    DocumentUpdate, Entry, EntryType, FeedOperation, JoinBucketsOperation, MoveOperation,
    NewConfigOperation, NoopOperation, Packet, PacketResult, PruneRemovedDocumentsOperation,
    RemoveOperation, ReplayErrorCode, ReplayProgress, SpoolerReplayCompleteOperation,
    SpoolerReplayStartOperation, SplitBucketOperation, UpdateOperation, WipeHistoryOperation,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn split(serial: u64, source: u64, target1: u64, target2: u64) -> Entry {
    FeedOperation::SplitBucket(SplitBucketOperation {
        serial,
        source: BucketId(source),
        target1: BucketId(target1),
        target2: BucketId(target2),
    })
    .to_entry()
}

fn wipe_history(serial: u64, limit: u64) -> Entry {
    FeedOperation::WipeHistory(WipeHistoryOperation {
        serial,
        wipe_time_limit: limit,
    })
    .to_entry()
}

fn update(serial: u64, legacy: bool) -> Entry {
    FeedOperation::Update(UpdateOperation {
        serial,
        bucket_id: BucketId(1),
        timestamp: serial,
        prev_timestamp: if legacy { 0 } else { serial - 1 },
        update: DocumentUpdate::new("music", "id:ns:music::1", b"increment".to_vec()),
        legacy_format: legacy,
    })
    .to_entry()
}

// =============================================================================
// Routing
// =============================================================================

/// Put, split and wipe history reach their collaborators in order.
#[test]
fn test_put_split_wipe_history_sequence() {
    let harness = Harness::new();
    let progress = Arc::new(ReplayProgress::new("music", 1, 3));
    let packet = Packet::from_entries([&put(1), &split(2, 0, 1, 2), &wipe_history(3, 777)]);

    let result = harness.replay(packet, Some(Arc::clone(&progress)));

    assert_eq!(result, PacketResult::Ok);
    assert_eq!(
        harness.journal.lines(),
        vec![
            "view[a].put(1)",
            "bucket_db.split(2,0,1,2)",
            "config_store.save_wipe_history(3,777)",
            "replay_config.wipe_history(3,777)",
        ]
    );
    assert_eq!(progress.current(), 3);
}

/// Every collaborator-visible entry type causes exactly one call.
#[test]
fn test_every_entry_type_routed_once() {
    let harness = Harness::new();
    let doc = Document::new("music", "id:ns:music::1", b"{}".to_vec());
    let entries = vec![
        put(1),
        FeedOperation::Remove(RemoveOperation {
            serial: 2,
            bucket_id: BucketId(1),
            timestamp: 2,
            document_id: doc.id.clone(),
        })
        .to_entry(),
        update(3, true),
        update(4, false),
        NewConfigOperation::entry_with_config(5, b"cfg"),
        FeedOperation::DeleteBucket(DeleteBucketOperation {
            serial: 6,
            bucket_id: BucketId(4),
        })
        .to_entry(),
        FeedOperation::JoinBuckets(JoinBucketsOperation {
            serial: 7,
            source1: BucketId(1),
            source2: BucketId(2),
            target: BucketId(3),
        })
        .to_entry(),
        FeedOperation::PruneRemovedDocuments(PruneRemovedDocumentsOperation {
            serial: 8,
            sub_db_id: 1,
            lids: vec![3, 4],
        })
        .to_entry(),
        FeedOperation::Move(MoveOperation {
            serial: 9,
            bucket_id: BucketId(1),
            timestamp: 9,
            document: doc,
            source_db: 0,
            source_lid: 1,
            target_db: 1,
            target_lid: 2,
        })
        .to_entry(),
        FeedOperation::CompactLidSpace(CompactLidSpaceOperation {
            serial: 10,
            sub_db_id: 0,
            lid_limit: 64,
        })
        .to_entry(),
    ];

    let result = harness.replay(Packet::from_entries(&entries), None);

    assert!(result.is_ok());
    assert_eq!(
        harness.journal.lines(),
        vec![
            "view[a].put(1)",
            "view[a].remove(2)",
            "view[a].update(3)",
            "view[a].update(4)",
            "config_store.deserialize_config(5,cfg)",
            "replay_config.config(5)",
            "view[a].delete_bucket(6)",
            "bucket_db.join(7,1,2,3)",
            "view[a].prune_removed_documents(8)",
            "view[a].move(9)",
            "view[a].compact_lid_space(10)",
        ]
    );
}

/// Noop, spooler markers and create bucket produce no collaborator call.
#[test]
fn test_ignored_entry_types_have_no_effect() {
    let harness = Harness::new();
    let packet = Packet::from_entries([
        &FeedOperation::Noop(NoopOperation { serial: 1 }).to_entry(),
        &FeedOperation::SpoolerReplayStart(SpoolerReplayStartOperation {
            serial: 2,
            spooler_serial: 100,
        })
        .to_entry(),
        &FeedOperation::SpoolerReplayComplete(SpoolerReplayCompleteOperation {
            serial: 3,
            spooler_serial: 100,
        })
        .to_entry(),
        &FeedOperation::CreateBucket(CreateBucketOperation {
            serial: 4,
            bucket_id: BucketId(9),
        })
        .to_entry(),
    ]);

    assert!(harness.replay(packet, None).is_ok());
    assert!(harness.journal.lines().is_empty());

    let snapshot = harness.state.metrics().snapshot();
    assert_eq!(snapshot.entries_replayed, 4);
    assert_eq!(snapshot.entries_ignored, 4);
}

// =============================================================================
// Feed View Indirection
// =============================================================================

/// A swap performed while handling one entry redirects the next entry.
#[test]
fn test_feed_view_swap_between_entries() {
    let harness = Harness::new();
    let journal = harness.journal.clone();
    let next = RecordingView::new("b", journal.clone());
    harness.slot.set(SwappingView::new(
        RecordingView::new("a", journal),
        harness.slot.clone(),
        next,
    ));

    let result = harness.replay(Packet::from_entries([&put(1), &put(2)]), None);

    assert!(result.is_ok());
    assert_eq!(harness.journal.lines(), vec!["view[a].put(1)", "view[b].put(2)"]);
}

/// A swap between packets takes effect without rebuilding the state.
#[test]
fn test_feed_view_swap_between_packets() {
    let harness = Harness::new();
    assert!(harness.replay(Packet::from_entries([&put(1)]), None).is_ok());

    harness
        .slot
        .set(RecordingView::new("c", harness.journal.clone()));
    assert!(harness.replay(Packet::from_entries([&put(2)]), None).is_ok());

    assert_eq!(harness.journal.lines(), vec!["view[a].put(1)", "view[c].put(2)"]);
}

/// A document operation with no feed view fails the packet; the worker lives on.
#[test]
fn test_missing_feed_view_fails_packet() {
    let harness = Harness::new();
    harness.slot.clear();

    let result = harness.replay(
        Packet::from_entries([&split(1, 0, 1, 2), &put(2), &split(3, 0, 1, 2)]),
        None,
    );

    assert!(result.has_code(ReplayErrorCode::ReplayNoActiveFeedView));
    assert_eq!(harness.journal.lines(), vec!["bucket_db.split(1,0,1,2)"]);

    harness
        .slot
        .set(RecordingView::new("a", harness.journal.clone()));
    assert!(harness.replay(Packet::from_entries([&put(4)]), None).is_ok());
}

// =============================================================================
// Failures
// =============================================================================

/// Unknown entry type fails the packet after earlier entries were applied.
#[test]
fn test_unknown_entry_type_aborts_remainder() {
    let harness = Harness::new();
    let packet = Packet::from_entries([&put(1), &Entry::new(2, 3, Vec::new()), &put(3)]);

    let result = harness.replay(packet, None);

    assert!(result.has_code(ReplayErrorCode::ReplayUnknownEntryType));
    assert_eq!(harness.journal.lines(), vec!["view[a].put(1)"]);
    assert_eq!(EntryType::from_u32(3), None);
}

/// A collaborator failure is fatal for the rest of the packet.
#[test]
fn test_collaborator_failure_aborts_remainder() {
    let harness = Harness::with_backend(|journal| RecordingBackend {
        fail_split_at: Some(2),
        ..RecordingBackend::new(journal)
    });
    let packet = Packet::from_entries([&put(1), &split(2, 0, 1, 2), &put(3)]);

    let result = harness.replay(packet, None);

    match &result {
        PacketResult::Failed { code, message } => {
            assert_eq!(code, "REPLAY_COLLABORATOR_FAILED");
            assert!(message.contains("split refused"));
            assert!(message.contains("serial: 2"));
        }
        PacketResult::Ok => panic!("packet should fail"),
    }
    assert_eq!(harness.journal.lines(), vec!["view[a].put(1)"]);
    assert_eq!(harness.state.metrics().snapshot().packets_failed, 1);
}

/// A panicking collaborator fails the packet through its result and the
/// worker keeps serving later packets.
#[test]
fn test_collaborator_panic_fails_packet() {
    let harness = Harness::new();
    harness.slot.set(PanickingView::new(
        RecordingView::new("a", harness.journal.clone()),
        2,
    ));

    let wrapper = harness.submit(Packet::from_entries([&put(1), &put(2), &put(3)]), None);
    let result = wrapper
        .wait_timeout(Duration::from_secs(10))
        .expect("gate released after panic");

    match &result {
        PacketResult::Failed { code, message } => {
            assert_eq!(code, "REPLAY_COLLABORATOR_FAILED");
            assert!(message.contains("feed view crashed on put 2"));
        }
        PacketResult::Ok => panic!("packet should fail"),
    }
    assert_eq!(harness.journal.lines(), vec!["view[a].put(1)"]);
    assert_eq!(harness.state.metrics().snapshot().packets_failed, 1);

    harness
        .slot
        .set(RecordingView::new("a", harness.journal.clone()));
    assert!(harness.replay(Packet::from_entries([&put(4)]), None).is_ok());
    assert!(!harness.executor.is_closed());
}
