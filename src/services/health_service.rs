use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `ok` or `degraded`, probing the board store on the way.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_board_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "board store health check failed");
            }
        }
        Err(_) => warn!("board store unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
