//! One store subscription per watched session, fanned out to the session's SSE hub.

use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{
    dao::board_store::BoardChange,
    dto::board::BoardView,
    services::sse_events,
    state::{
        SharedState,
        board::{BoardState, SessionId},
        session::SessionRuntime,
    },
};

/// How often an idle watcher checks whether anyone is still listening.
const LISTENER_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Start the watcher for `session` unless one is already running.
pub fn ensure_watching(state: &SharedState, session: &SessionId) {
    let runtime = state.session(session);
    if !runtime.try_start_watching() {
        return;
    }

    let state = state.clone();
    let session = session.clone();
    tokio::spawn(async move {
        loop {
            watch(&state, &session, &runtime).await;
            runtime.stop_watching();
            // A listener may have arrived while this watcher was winding down.
            if runtime.hub().receiver_count() == 0 || !runtime.try_start_watching() {
                break;
            }
        }
        info!(%session, "board watcher stopped");
    });
}

async fn watch(state: &SharedState, session: &SessionId, runtime: &Arc<SessionRuntime>) {
    let store = match state.require_board_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(%session, error = %err, "cannot watch board without a store");
            return;
        }
    };
    let subscription = match store.subscribe(session).await {
        Ok(subscription) => subscription,
        Err(err) => {
            warn!(%session, error = %err, "board subscription failed");
            return;
        }
    };
    info!(%session, "board watcher started");

    let mut changes = subscription.changes;
    let mut listener_check = interval(LISTENER_CHECK_INTERVAL);
    listener_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            change = changes.next() => match change {
                Some(change) => forward_change(state, session, runtime, change).await,
                None => {
                    debug!(%session, "board change stream ended");
                    break;
                }
            },
            _ = listener_check.tick() => {}
        }

        if runtime.hub().receiver_count() == 0 {
            break;
        }
    }
}

/// Broadcast one store change unless it is the echo of a write this server already announced.
///
/// A record without a pending reward also clears the locally displayed one, so a dismissal
/// made through another server closes the modal here too.
pub async fn forward_change(
    state: &SharedState,
    session: &SessionId,
    runtime: &SessionRuntime,
    change: BoardChange,
) {
    if let Some(tag) = change.origin {
        if runtime.echo_guard().consume(&tag) {
            debug!(%session, %tag, "skipping echo of local write");
            return;
        }
    }

    let reward_closed = change.record.as_ref().is_none_or(|record| !record.reward_pending);
    if reward_closed {
        runtime.clear_reward().await;
    }

    match change.record {
        Some(record) => {
            let board = BoardState::from_record(record, state.config().labels());
            sse_events::broadcast_board_updated(runtime.hub(), &BoardView::new(session, &board));
        }
        None => sse_events::broadcast_board_absent(runtime.hub(), session),
    }
}
