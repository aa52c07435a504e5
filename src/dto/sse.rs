use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::reward::Celebration,
    state::{engine::Line, rewards::RewardTier},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE `event:` name.
    pub event: Option<String>,
    /// JSON payload for the `data:` field.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent instead of a snapshot when the session has no board yet.
pub struct BoardAbsentEvent {
    /// Session without a board.
    pub session: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a capture landed without unlocking a reward.
pub struct CellFilledEvent {
    /// Cell that received the photo.
    pub index: usize,
    /// Every complete line after the capture.
    #[schema(value_type = Vec<Vec<u32>>)]
    pub completed_lines: Vec<Line>,
    /// Plain fill confetti.
    pub celebration: Celebration,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the reward modal was closed.
pub struct RewardDismissedEvent {
    /// Tier that was on screen, if this server knew about it.
    pub tier: Option<RewardTier>,
}
