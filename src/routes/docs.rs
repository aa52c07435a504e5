use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

const DOCS_PATH: &str = "/docs";
const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI for the board, gate, palette and event endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    let docs: Router<SharedState> = SwaggerUi::new(DOCS_PATH)
        .url(OPENAPI_PATH, ApiDoc::openapi())
        .into();
    docs.with_state(state)
}
