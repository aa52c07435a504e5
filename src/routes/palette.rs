use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::header,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::palette::{PaletteView, SwatchPath, SwatchView, UpdateSwatchRequest},
    error::AppError,
    services::{gate_service::require_unlocked, palette_service},
    state::SharedState,
};

/// Mood-board palette endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/palette", get(list_palette))
        .route("/palette/swatches", post(add_swatch))
        .route(
            "/palette/swatches/{id}",
            patch(update_swatch).delete(remove_swatch),
        )
        .route("/palette/swatches/{id}/photo", put(set_swatch_photo))
        .route("/palette/export.png", get(export_palette))
        .route_layer(middleware::from_fn_with_state(state, require_unlocked))
}

#[utoipa::path(
    get,
    path = "/palette",
    tag = "palette",
    responses((status = 200, description = "Current palette", body = PaletteView))
)]
pub async fn list_palette(State(state): State<SharedState>) -> Json<PaletteView> {
    Json(palette_service::list(&state).await)
}

/// Append a blank swatch.
#[utoipa::path(
    post,
    path = "/palette/swatches",
    tag = "palette",
    responses(
        (status = 200, description = "Swatch added", body = SwatchView),
        (status = 409, description = "Palette already full"),
        (status = 507, description = "Preference quota exhausted")
    )
)]
pub async fn add_swatch(State(state): State<SharedState>) -> Result<Json<SwatchView>, AppError> {
    let swatch = palette_service::add_swatch(&state).await?;
    Ok(Json(swatch))
}

/// Rename or recolor a swatch.
#[utoipa::path(
    patch,
    path = "/palette/swatches/{id}",
    tag = "palette",
    params(SwatchPath),
    request_body = UpdateSwatchRequest,
    responses(
        (status = 200, description = "Swatch updated", body = SwatchView),
        (status = 400, description = "Invalid name or color"),
        (status = 404, description = "Unknown swatch")
    )
)]
pub async fn update_swatch(
    State(state): State<SharedState>,
    Path(path): Path<SwatchPath>,
    Valid(Json(payload)): Valid<Json<UpdateSwatchRequest>>,
) -> Result<Json<SwatchView>, AppError> {
    let swatch = palette_service::update_swatch(&state, path.id, payload).await?;
    Ok(Json(swatch))
}

/// Attach a photo to a swatch. The body is the raw image file.
#[utoipa::path(
    put,
    path = "/palette/swatches/{id}/photo",
    tag = "palette",
    params(SwatchPath),
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "JPEG or PNG bytes"),
    responses(
        (status = 200, description = "Photo attached", body = SwatchView),
        (status = 404, description = "Unknown swatch"),
        (status = 422, description = "Body is not a decodable image")
    )
)]
pub async fn set_swatch_photo(
    State(state): State<SharedState>,
    Path(path): Path<SwatchPath>,
    body: Bytes,
) -> Result<Json<SwatchView>, AppError> {
    let swatch = palette_service::set_photo(&state, path.id, body.to_vec()).await?;
    Ok(Json(swatch))
}

#[utoipa::path(
    delete,
    path = "/palette/swatches/{id}",
    tag = "palette",
    params(SwatchPath),
    responses(
        (status = 200, description = "Remaining palette", body = PaletteView),
        (status = 404, description = "Unknown swatch")
    )
)]
pub async fn remove_swatch(
    State(state): State<SharedState>,
    Path(path): Path<SwatchPath>,
) -> Result<Json<PaletteView>, AppError> {
    let palette = palette_service::remove_swatch(&state, path.id).await?;
    Ok(Json(palette))
}

/// Download the palette stripes as a PNG.
#[utoipa::path(
    get,
    path = "/palette/export.png",
    tag = "palette",
    responses(
        (status = 200, description = "Palette image", content_type = "image/png", body = Vec<u8>),
        (status = 409, description = "No swatch has a photo yet")
    )
)]
pub async fn export_palette(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let png = palette_service::export_png(&state).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
