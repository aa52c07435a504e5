use axum::Router;

use crate::state::SharedState;

pub mod board;
pub mod docs;
pub mod gate;
pub mod health;
pub mod palette;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
///
/// Board, SSE and palette routes pass through the unlock gate; health, gate and docs do not.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(gate::router())
        .merge(board::router(state.clone()))
        .merge(sse::router(state.clone()))
        .merge(palette::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
