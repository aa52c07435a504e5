use std::sync::Arc;

use dashmap::DashMap;
use futures::{StreamExt, future::BoxFuture};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::{
    dao::{
        board_store::{BoardChange, BoardStore, BoardSubscription},
        models::{BoardRecord, FieldPath, FieldValue, WriteTag},
        storage::{StorageError, StorageResult},
    },
    state::board::SessionId,
};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// In-process board store: one record and one change channel per session.
///
/// Mutations and their notifications happen under the record's map entry lock, so writes to
/// distinct cells never lose each other and subscribers see changes in write order.
#[derive(Clone, Default)]
pub struct MemoryBoardStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    records: DashMap<SessionId, BoardRecord>,
    channels: DashMap<SessionId, broadcast::Sender<BoardChange>>,
}

impl MemoryBoardStore {
    /// Empty store with no sessions.
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, session: &SessionId) -> broadcast::Sender<BoardChange> {
        self.inner
            .channels
            .entry(session.clone())
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn notify(&self, session: &SessionId, record: BoardRecord, tag: WriteTag) {
        // No receivers is fine: nobody is watching this session yet.
        let _ = self.sender(session).send(BoardChange {
            record: Some(record),
            origin: Some(tag),
        });
    }
}

impl BoardStore for MemoryBoardStore {
    fn subscribe(
        &self,
        session: &SessionId,
    ) -> BoxFuture<'static, StorageResult<BoardSubscription>> {
        let store = self.clone();
        let session = session.clone();
        Box::pin(async move {
            // Subscribe before reading so no change can slip between the two.
            let receiver = store.sender(&session).subscribe();
            let initial = store
                .inner
                .records
                .get(&session)
                .map(|entry| entry.value().clone());
            let changes = BroadcastStream::new(receiver)
                .filter_map(|item| async move { item.ok() })
                .boxed();
            Ok(BoardSubscription { initial, changes })
        })
    }

    fn write_field(
        &self,
        session: &SessionId,
        path: FieldPath,
        value: FieldValue,
        tag: WriteTag,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let session = session.clone();
        Box::pin(async move {
            let mut entry =
                store
                    .inner
                    .records
                    .get_mut(&session)
                    .ok_or_else(|| StorageError::MissingRecord {
                        session: session.to_string(),
                    })?;
            entry.apply(path, value)?;
            let updated = entry.value().clone();
            store.notify(&session, updated, tag);
            drop(entry);
            Ok(())
        })
    }

    fn read_once(
        &self,
        session: &SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<BoardRecord>>> {
        let store = self.clone();
        let session = session.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .records
                .get(&session)
                .map(|entry| entry.value().clone()))
        })
    }

    fn replace_all(
        &self,
        session: &SessionId,
        record: BoardRecord,
        tag: WriteTag,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let session = session.clone();
        Box::pin(async move {
            let mut entry = store
                .inner
                .records
                .entry(session.clone())
                .or_insert_with(BoardRecord::empty);
            *entry = record.clone();
            store.notify(&session, record, tag);
            drop(entry);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
