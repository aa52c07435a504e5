use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::validation::validate_hex_color,
    state::palette::{MAX_SWATCHES, Palette, Swatch, contrast_color},
};

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// One swatch of the mood-board.
pub struct SwatchView {
    /// Swatch identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// `#RRGGBB`
    pub color: String,
    /// Readable text color on top of `color`.
    pub text_color: String,
    /// JPEG data URL, omitted until a photo is attached.
    pub photo: Option<String>,
}

impl From<&Swatch> for SwatchView {
    fn from(swatch: &Swatch) -> Self {
        Self {
            id: swatch.id,
            name: swatch.name.clone(),
            color: swatch.color.clone(),
            text_color: contrast_color(&swatch.color).to_owned(),
            photo: swatch.photo.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Whole palette with its capacity.
pub struct PaletteView {
    /// Swatches in insertion order.
    pub swatches: Vec<SwatchView>,
    /// Swatches that carry a photo.
    pub filled: usize,
    /// Maximum number of swatches.
    pub capacity: usize,
}

impl From<&Palette> for PaletteView {
    fn from(palette: &Palette) -> Self {
        Self {
            swatches: palette.iter().map(SwatchView::from).collect(),
            filled: palette.filled().count(),
            capacity: MAX_SWATCHES,
        }
    }
}

/// Partial update of a swatch; omitted fields are left untouched.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateSwatchRequest {
    /// New display name.
    #[validate(length(min = 1, max = 40))]
    pub name: Option<String>,
    /// New `#RRGGBB` color.
    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,
}

/// `{id}` segment of the swatch routes.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct SwatchPath {
    /// Swatch identifier.
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_validation() {
        let ok = UpdateSwatchRequest {
            name: Some("Sofa Oyen".into()),
            color: Some("#112233".into()),
        };
        assert!(ok.validate().is_ok());

        let empty = UpdateSwatchRequest {
            name: None,
            color: None,
        };
        assert!(empty.validate().is_ok());

        let bad_color = UpdateSwatchRequest {
            name: None,
            color: Some("red".into()),
        };
        assert!(bad_color.validate().is_err());

        let blank_name = UpdateSwatchRequest {
            name: Some(String::new()),
            color: None,
        };
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn view_carries_contrast_color() {
        let mut palette = Palette::default();
        palette.add().unwrap();
        let view = PaletteView::from(&palette);
        assert_eq!(view.capacity, 5);
        assert_eq!(view.filled, 0);
        assert_eq!(view.swatches[0].text_color, "#1a1a1a");
    }
}
