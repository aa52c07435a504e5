use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use time::OffsetDateTime;

use crate::{
    dto::gate::{GateStatus, KnockResponse},
    services::gate_service,
    state::SharedState,
};

/// Lock screen endpoints. Always reachable, even before the unlock instant.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/gate", get(gate_status))
        .route("/gate/knock", post(knock))
}

/// Countdown to the unlock instant.
#[utoipa::path(
    get,
    path = "/gate",
    tag = "gate",
    responses((status = 200, description = "Gate status", body = GateStatus))
)]
pub async fn gate_status(State(state): State<SharedState>) -> Json<GateStatus> {
    Json(gate_service::gate_status(
        OffsetDateTime::now_utc(),
        state.config(),
    ))
}

#[utoipa::path(
    post,
    path = "/gate/knock",
    tag = "gate",
    responses((status = 200, description = "Next teaser message", body = KnockResponse))
)]
pub async fn knock(State(state): State<SharedState>) -> Json<KnockResponse> {
    Json(gate_service::knock(&state))
}
