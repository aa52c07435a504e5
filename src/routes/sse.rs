use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::sse::{Event, Sse},
    routing::get,
};
use axum_valid::Valid;
use futures::Stream;
use tracing::info;

use crate::{
    dto::board::SessionPath,
    error::AppError,
    services::{gate_service::require_unlocked, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sessions/{id}/events",
    tag = "sse",
    params(SessionPath),
    responses(
        (status = 200, description = "Board SSE stream", content_type = "text/event-stream", body = String),
        (status = 503, description = "Board store unavailable")
    )
)]
/// Stream board changes for one session, starting with the current snapshot.
pub async fn board_events(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<SessionPath>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let session = path.session()?;
    let subscription = sse_service::subscribe_session(&state, &session).await?;
    info!(%session, "new board SSE connection");
    Ok(sse_service::to_sse_stream(subscription, session))
}

/// Configure the SSE endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sessions/{id}/events", get(board_events))
        .route_layer(middleware::from_fn_with_state(state, require_unlocked))
}
