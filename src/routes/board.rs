use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    middleware,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        board::{BoardView, CaptureResponse, CellPath, SessionPath},
        reward::RewardSlotResponse,
    },
    error::AppError,
    services::{board_service, gate_service::require_unlocked},
    state::SharedState,
};

/// Session board endpoints, closed while the gate is enforced and locked.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/sessions/{id}", get(get_board).post(open_board))
        .route("/sessions/{id}/cells/{index}/photo", put(capture_photo))
        .route("/sessions/{id}/reward", get(current_reward))
        .route("/sessions/{id}/reward/dismiss", post(dismiss_reward))
        .route("/sessions/{id}/reset", post(reset_board))
        .route_layer(middleware::from_fn_with_state(state, require_unlocked))
}

/// Open the board for a session, creating it when absent.
#[utoipa::path(
    post,
    path = "/sessions/{id}",
    tag = "board",
    params(SessionPath),
    responses(
        (status = 200, description = "Board opened", body = BoardView),
        (status = 503, description = "Board store unavailable")
    )
)]
pub async fn open_board(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<SessionPath>>,
) -> Result<Json<BoardView>, AppError> {
    let session = path.session()?;
    let view = board_service::open_board(&state, &session).await?;
    Ok(Json(view))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "board",
    params(SessionPath),
    responses(
        (status = 200, description = "Current board", body = BoardView),
        (status = 404, description = "No board for this session")
    )
)]
pub async fn get_board(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<SessionPath>>,
) -> Result<Json<BoardView>, AppError> {
    let session = path.session()?;
    let view = board_service::get_board(&state, &session).await?;
    Ok(Json(view))
}

/// Upload a photo for one cell. The body is the raw image file.
#[utoipa::path(
    put,
    path = "/sessions/{id}/cells/{index}/photo",
    tag = "board",
    params(CellPath),
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "JPEG or PNG bytes"),
    responses(
        (status = 200, description = "Photo stored", body = CaptureResponse),
        (status = 400, description = "Cell index out of range"),
        (status = 409, description = "Cell already has a photo"),
        (status = 413, description = "Upload too large"),
        (status = 422, description = "Body is not a decodable image"),
        (status = 503, description = "Board store unavailable, retry")
    )
)]
pub async fn capture_photo(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<CellPath>>,
    body: Bytes,
) -> Result<Json<CaptureResponse>, AppError> {
    let session = path.session()?;
    let response = board_service::capture_photo(&state, &session, path.index, body.to_vec()).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/reward",
    tag = "board",
    params(SessionPath),
    responses((status = 200, description = "Reward currently on screen, if any", body = RewardSlotResponse))
)]
pub async fn current_reward(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<SessionPath>>,
) -> Result<Json<RewardSlotResponse>, AppError> {
    let session = path.session()?;
    let slot = board_service::current_reward(&state, &session).await?;
    Ok(Json(slot))
}

/// Close the reward modal.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reward/dismiss",
    tag = "board",
    params(SessionPath),
    responses(
        (status = 200, description = "Reward dismissed", body = BoardView),
        (status = 409, description = "No reward to dismiss")
    )
)]
pub async fn dismiss_reward(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<SessionPath>>,
) -> Result<Json<BoardView>, AppError> {
    let session = path.session()?;
    let view = board_service::dismiss_reward(&state, &session).await?;
    Ok(Json(view))
}

/// Clear every photo and claim.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reset",
    tag = "board",
    params(SessionPath),
    responses((status = 200, description = "Fresh board", body = BoardView))
)]
pub async fn reset_board(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<SessionPath>>,
) -> Result<Json<BoardView>, AppError> {
    let session = path.session()?;
    let view = board_service::reset_board(&state, &session).await?;
    Ok(Json(view))
}
