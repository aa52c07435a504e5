use serde::Serialize;
use utoipa::ToSchema;

/// Body of `/healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` while a board store is installed, `degraded` while boards are unreachable.
    pub status: String,
}

impl HealthResponse {
    /// Board store reachable.
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }

    /// Running without a board store; the palette and gate still answer.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".into(),
        }
    }
}
