use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::debug;

use crate::{
    config::AppConfig,
    dto::gate::{GateStatus, KnockResponse, TimeLeft},
    error::{AppError, ServiceError},
    state::SharedState,
};

const ALMOST_TIME_SECONDS: u64 = 3_600;
const FALLBACK_KNOCK: &str = "Not yet!";

/// Whole seconds from `now` until `unlock_at`, clamped at zero once the instant has passed.
pub fn time_left(now: OffsetDateTime, unlock_at: OffsetDateTime) -> TimeLeft {
    let remaining = (unlock_at - now).whole_seconds().max(0);
    TimeLeft::from_seconds(remaining as u64)
}

/// Lock screen state at `now`.
pub fn gate_status(now: OffsetDateTime, config: &AppConfig) -> GateStatus {
    let unlock_at = config.unlock_at();
    let unlocked = now >= unlock_at;
    let remaining = time_left(now, unlock_at);
    let almost_time = !unlocked && remaining.total_seconds() < ALMOST_TIME_SECONDS;
    GateStatus::new(
        unlocked,
        unlock_at,
        config.gate().message.clone(),
        remaining,
        almost_time,
    )
}

/// Count a knock and pick the next teaser line.
pub fn knock(state: &SharedState) -> KnockResponse {
    let previous = state.record_knock();
    let messages = &state.config().gate().knock_messages;
    let message = if messages.is_empty() {
        FALLBACK_KNOCK.to_owned()
    } else {
        messages[(previous % messages.len() as u64) as usize].clone()
    };
    KnockResponse {
        message,
        knocks: previous + 1,
    }
}

/// Reject gated requests with `423 Locked` while enforcement is on and the unlock instant
/// is still ahead.
pub async fn require_unlocked(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let config = state.config();
    if config.gate().enforce {
        let unlock_at = config.unlock_at();
        if OffsetDateTime::now_utc() < unlock_at {
            debug!(path = %req.uri().path(), "request refused before unlock");
            let until = unlock_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| unlock_at.to_string());
            return Err(ServiceError::Locked(until).into());
        }
    }
    Ok(next.run(req).await)
}
