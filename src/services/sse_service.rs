use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dto::{board::BoardView, sse::ServerEvent},
    error::ServiceError,
    services::{session_watcher, sse_events},
    state::{
        SharedState,
        board::{BoardState, SessionId},
    },
};

/// A live subscription to one session's board stream.
pub struct SessionSubscription {
    /// Receives every event broadcast after the subscription was taken.
    pub receiver: broadcast::Receiver<ServerEvent>,
    /// Current board (or the absent sentinel), sent before anything else.
    pub initial: Option<ServerEvent>,
}

/// Subscribe to `session`: join its hub, make sure the store is being watched and read the
/// current snapshot.
///
/// The hub is joined before the snapshot is read so no change committed in between is lost.
pub async fn subscribe_session(
    state: &SharedState,
    session: &SessionId,
) -> Result<SessionSubscription, ServiceError> {
    let store = state.require_board_store().await?;
    let runtime = state.session(session);
    let receiver = runtime.hub().subscribe();
    session_watcher::ensure_watching(state, session);

    let record = store.read_once(session).await?;
    let view = record.map(|record| {
        BoardView::new(
            session,
            &BoardState::from_record(record, state.config().labels()),
        )
    });
    let initial = sse_events::initial_event(session, view.as_ref());
    Ok(SessionSubscription { receiver, initial })
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a session subscription into an SSE response, forwarding events until the client
/// disconnects.
pub fn to_sse_stream(
    subscription: SessionSubscription,
    session: SessionId,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let SessionSubscription {
        mut receiver,
        initial,
    } = subscription;
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(payload) = initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                debug!(%session, "SSE client left before the snapshot");
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(%session, skipped, "SSE client lagging; events dropped");
                            continue;
                        }
                    }
                }
            }
        }

        info!(%session, "board SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{board_store::memory::MemoryBoardStore, preferences::MemoryPreferenceStore},
        services::sse_events::{EVENT_BOARD_ABSENT, EVENT_BOARD_SNAPSHOT},
        state::AppState,
    };

    async fn state() -> SharedState {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemoryPreferenceStore::new(1024)),
        );
        state.set_board_store(Arc::new(MemoryBoardStore::new())).await;
        state
    }

    #[tokio::test]
    async fn missing_board_starts_with_absent_event() {
        let state = state().await;
        let session = SessionId::parse("nobody").unwrap();
        let subscription = subscribe_session(&state, &session).await.unwrap();
        let initial = subscription.initial.unwrap();
        assert_eq!(initial.event.as_deref(), Some(EVENT_BOARD_ABSENT));
    }

    #[tokio::test]
    async fn existing_board_starts_with_snapshot() {
        let state = state().await;
        let session = SessionId::parse("alice").unwrap();
        crate::services::board_service::open_board(&state, &session)
            .await
            .unwrap();

        let subscription = subscribe_session(&state, &session).await.unwrap();
        let initial = subscription.initial.unwrap();
        assert_eq!(initial.event.as_deref(), Some(EVENT_BOARD_SNAPSHOT));
        let payload: serde_json::Value = serde_json::from_str(&initial.data).unwrap();
        assert_eq!(payload["filled"], 0);
    }

    #[tokio::test]
    async fn degraded_state_refuses_subscription() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemoryPreferenceStore::new(1024)),
        );
        let session = SessionId::parse("alice").unwrap();
        assert!(matches!(
            subscribe_session(&state, &session).await,
            Err(ServiceError::Degraded)
        ));
    }
}
