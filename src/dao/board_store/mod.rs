#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::dao::models::{BoardRecord, FieldPath, FieldValue, WriteTag};
use crate::dao::storage::StorageResult;
use crate::state::board::SessionId;

pub use self::memory::MemoryBoardStore;

/// Notification delivered to subscribers after any mutation of a session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardChange {
    /// Full record after the mutation, `None` when the record was deleted.
    pub record: Option<BoardRecord>,
    /// Tag of the write that produced this change, when the backend reports it.
    pub origin: Option<WriteTag>,
}

/// Live subscription to one session record. Dropping it unsubscribes.
pub struct BoardSubscription {
    /// Record at subscription time; `None` is the "absent" sentinel.
    pub initial: Option<BoardRecord>,
    /// Every subsequent change, in the order the backend delivered them.
    pub changes: BoxStream<'static, BoardChange>,
}

/// Abstraction over the remote key-value store holding shared boards.
pub trait BoardStore: Send + Sync {
    /// Follow one session record: its current value, then every change.
    fn subscribe(
        &self,
        session: &SessionId,
    ) -> BoxFuture<'static, StorageResult<BoardSubscription>>;
    /// Atomically set one field without clobbering siblings.
    fn write_field(
        &self,
        session: &SessionId,
        path: FieldPath,
        value: FieldValue,
        tag: WriteTag,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch the authoritative record, bypassing any cache.
    fn read_once(
        &self,
        session: &SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<BoardRecord>>>;
    /// Atomically overwrite the whole record.
    fn replace_all(
        &self,
        session: &SessionId,
        record: BoardRecord,
        tag: WriteTag,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap liveness check used by the supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
