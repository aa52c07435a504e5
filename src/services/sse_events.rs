use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        board::BoardView,
        reward::{Celebration, RewardPresentation},
        sse::{BoardAbsentEvent, CellFilledEvent, RewardDismissedEvent, ServerEvent},
    },
    state::{SseHub, board::SessionId, engine::Line, rewards::RewardTier},
};

/// Full board sent to a newly connected client.
pub const EVENT_BOARD_SNAPSHOT: &str = "board.snapshot";
/// The session has no board yet.
pub const EVENT_BOARD_ABSENT: &str = "board.absent";
/// The board changed through another server or client.
pub const EVENT_BOARD_UPDATED: &str = "board.updated";
/// Every photo and claim was wiped.
pub const EVENT_BOARD_RESET: &str = "board.reset";
/// A capture landed without a reward.
pub const EVENT_CELL_FILLED: &str = "cell.filled";
/// A capture unlocked a reward.
pub const EVENT_REWARD_UNLOCKED: &str = "reward.unlocked";
/// The reward modal was closed.
pub const EVENT_REWARD_DISMISSED: &str = "reward.dismissed";

/// Initial event for a new SSE client: the current board, or the absent sentinel.
pub fn initial_event(session: &SessionId, board: Option<&BoardView>) -> Option<ServerEvent> {
    let built = match board {
        Some(view) => ServerEvent::json(Some(EVENT_BOARD_SNAPSHOT.to_string()), view),
        None => ServerEvent::json(
            Some(EVENT_BOARD_ABSENT.to_string()),
            &BoardAbsentEvent {
                session: session.to_string(),
            },
        ),
    };
    match built {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(%session, error = %err, "failed to serialize initial SSE payload");
            None
        }
    }
}

/// Forward a board change observed in the store.
pub fn broadcast_board_updated(hub: &SseHub, view: &BoardView) {
    send_session_event(hub, EVENT_BOARD_UPDATED, view);
}

/// Announce that the session record disappeared from the store.
pub fn broadcast_board_absent(hub: &SseHub, session: &SessionId) {
    let payload = BoardAbsentEvent {
        session: session.to_string(),
    };
    send_session_event(hub, EVENT_BOARD_ABSENT, &payload);
}

/// Announce a reset issued through this server.
pub fn broadcast_board_reset(hub: &SseHub, view: &BoardView) {
    send_session_event(hub, EVENT_BOARD_RESET, view);
}

/// Announce a capture that unlocked nothing.
pub fn broadcast_cell_filled(
    hub: &SseHub,
    index: usize,
    completed_lines: Vec<Line>,
    celebration: Celebration,
) {
    let payload = CellFilledEvent {
        index,
        completed_lines,
        celebration,
    };
    send_session_event(hub, EVENT_CELL_FILLED, &payload);
}

/// Announce the reward that just fired.
pub fn broadcast_reward_unlocked(hub: &SseHub, presentation: &RewardPresentation) {
    send_session_event(hub, EVENT_REWARD_UNLOCKED, presentation);
}

/// Announce that the reward modal closed.
pub fn broadcast_reward_dismissed(hub: &SseHub, tier: Option<RewardTier>) {
    send_session_event(hub, EVENT_REWARD_DISMISSED, &RewardDismissedEvent { tier });
}

fn send_session_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize session SSE payload"),
    }
}
