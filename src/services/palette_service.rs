//! Local mood-board palette: up to five color swatches, persisted through the preference
//! store and exportable as a striped PNG.

use image::{Rgb, RgbImage};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::palette::{PaletteView, SwatchView, UpdateSwatchRequest},
    error::ServiceError,
    services::image_service,
    state::{
        SharedState,
        palette::{Palette, parse_hex_color},
    },
};

const STRIPE_WIDTH: u32 = 140;
const STRIPE_HEIGHT: u32 = 360;
const STRIPE_GAP: u32 = 6;
const STRIPE_TOP_OFFSET: u32 = 8;
const PADDING: u32 = 32;
const FOOTER: u32 = 50;
const BACKGROUND: Rgb<u8> = Rgb([0xF9, 0xF5, 0xF1]);

/// Read the persisted palette into the shared state. A missing file yields an empty palette;
/// an unreadable one is logged and replaced by an empty palette.
pub async fn load_palette(state: &SharedState) {
    let palette = match state.preferences().load().await {
        Ok(entities) => Palette::from_entities(entities),
        Err(err) => {
            warn!(error = %err, "failed to load palette; starting empty");
            Palette::default()
        }
    };
    info!(swatches = palette.len(), "palette loaded");
    *state.palette().write().await = palette;
}

/// Current palette.
pub async fn list(state: &SharedState) -> PaletteView {
    PaletteView::from(&*state.palette().read().await)
}

/// Apply `change` to a copy of the palette, persist it, then publish it.
///
/// The shared palette is only replaced once the save succeeded.
async fn commit<T>(
    state: &SharedState,
    change: impl FnOnce(&mut Palette) -> Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    let mut guard = state.palette().write().await;
    let mut next = guard.clone();
    let outcome = change(&mut next)?;
    if let Err(err) = state.preferences().save(next.to_entities()).await {
        warn!(error = %err, "failed to save palette; keeping previous version");
        return Err(err.into());
    }
    *guard = next;
    Ok(outcome)
}

fn missing(id: &Uuid) -> ServiceError {
    ServiceError::NotFound(format!("swatch `{id}`"))
}

/// Append a swatch with a placeholder name and color.
pub async fn add_swatch(state: &SharedState) -> Result<SwatchView, ServiceError> {
    let view = commit(state, |palette| {
        let swatch = palette.add()?;
        Ok(SwatchView::from(swatch))
    })
    .await?;
    info!(swatch = %view.id, "swatch added");
    Ok(view)
}

/// Rename and/or recolor a swatch.
pub async fn update_swatch(
    state: &SharedState,
    id: Uuid,
    request: UpdateSwatchRequest,
) -> Result<SwatchView, ServiceError> {
    let color = match request.color {
        Some(color) if parse_hex_color(&color).is_none() => {
            return Err(ServiceError::InvalidInput(format!(
                "`{color}` is not a #RRGGBB color"
            )));
        }
        other => other,
    };
    commit(state, |palette| {
        palette
            .update(&id, request.name, color)
            .map(SwatchView::from)
            .ok_or_else(|| missing(&id))
    })
    .await
}

/// Attach a photo to a swatch, downscaled like board photos.
pub async fn set_photo(
    state: &SharedState,
    id: Uuid,
    image: Vec<u8>,
) -> Result<SwatchView, ServiceError> {
    if state.palette().read().await.get(&id).is_none() {
        return Err(missing(&id));
    }
    let encoded = image_service::downscale_async(image, state.config().image()).await?;
    commit(state, |palette| {
        palette
            .set_photo(&id, encoded.data_url)
            .map(SwatchView::from)
            .ok_or_else(|| missing(&id))
    })
    .await
}

/// Delete a swatch and return what remains.
pub async fn remove_swatch(state: &SharedState, id: Uuid) -> Result<PaletteView, ServiceError> {
    commit(state, |palette| {
        palette.remove(&id).ok_or_else(|| missing(&id))?;
        Ok(PaletteView::from(&*palette))
    })
    .await
}

/// Draw one stripe per swatch that has a photo, or `None` when there are none.
pub fn render_palette(palette: &Palette) -> Option<RgbImage> {
    let colors: Vec<Rgb<u8>> = palette
        .filled()
        .map(|swatch| Rgb(parse_hex_color(&swatch.color).unwrap_or(BACKGROUND.0)))
        .collect();
    if colors.is_empty() {
        return None;
    }

    let count = colors.len() as u32;
    let width = PADDING * 2 + count * STRIPE_WIDTH + (count - 1) * STRIPE_GAP;
    let height = PADDING * 2 + STRIPE_HEIGHT + FOOTER;
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

    let top = PADDING + STRIPE_TOP_OFFSET;
    for (i, color) in colors.into_iter().enumerate() {
        let left = PADDING + i as u32 * (STRIPE_WIDTH + STRIPE_GAP);
        for y in top..top + STRIPE_HEIGHT {
            for x in left..left + STRIPE_WIDTH {
                canvas.put_pixel(x, y, color);
            }
        }
    }
    Some(canvas)
}

/// PNG of the palette stripes.
pub async fn export_png(state: &SharedState) -> Result<Vec<u8>, ServiceError> {
    let canvas = render_palette(&*state.palette().read().await).ok_or_else(|| {
        ServiceError::InvalidState("no swatch has a photo yet".into())
    })?;
    let png = tokio::task::spawn_blocking(move || image_service::encode_png(canvas))
        .await
        .map_err(|err| ServiceError::Internal(format!("image worker failed: {err}")))??;
    Ok(png)
}
