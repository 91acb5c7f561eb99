//! Transaction log replay
//!
//! Decodes replay packets into feed operations and applies them, in serial
//! order, to the collaborators of a recovering feed.
//!
//! Flow for one packet:
//! 1. The caller wraps the packet bytes in a `PacketWrapper`
//! 2. `ReplayTransactionLogState::receive` schedules it on an `Executor`
//! 3. The worker decodes each entry and dispatches it to the handler
//! 4. Progress is reported per entry
//! 5. The result is written and the wrapper's gate released
//!
//! Replay within a packet is not transactional. Entries dispatched before a
//! failure stay applied; the log is the durability boundary.

pub mod dispatcher;
pub mod entry;
pub mod errors;
pub mod executor;
pub mod feed;
pub mod handler;
pub mod operation;
pub mod packet;
pub mod progress;
pub mod state;

pub use dispatcher::{decode_entry, dispatch_operation, ReplayPacketDispatcher, ReplayPacketHandler};
pub use entry::{decode_all, Entry, EntryDecoder, Packet, ENTRY_OVERHEAD};
pub use errors::{ReplayError, ReplayErrorCode, ReplayResult};
pub use executor::{Executor, SingleThreadExecutor, Task};
pub use feed::{BucketDbHandler, FeedConfigStore, FeedView, FeedViewSlot, ReplayConfigNotifier};
pub use handler::TransactionLogReplayHandler;
pub use operation::{
    BucketId, CompactLidSpaceOperation, CreateBucketOperation, DeleteBucketOperation, Document,
    DocumentId, DocumentTypeRepo, DocumentUpdate, EntryType, FeedOperation, JoinBucketsOperation,
    MoveOperation, NewConfigOperation, NewConfigStreamHandler, NoopOperation,
    PruneRemovedDocumentsOperation, PutOperation, RemoveOperation, SpoolerReplayCompleteOperation,
    SpoolerReplayStartOperation, SplitBucketOperation, UpdateOperation, WipeHistoryOperation,
};
pub use packet::{CompletionGate, PacketResult, PacketWrapper};
pub use progress::{handle_progress, ReplayProgress, REPLAY_PROGRESS_INTERVAL};
pub use state::{FeedState, FeedStateType, ReplayTransactionLogState};
