use indexmap::IndexMap;
use uuid::Uuid;

use crate::dao::models::SwatchEntity;

/// Maximum number of swatches a palette can hold.
pub const MAX_SWATCHES: usize = 5;
/// Color given to a freshly added swatch.
pub const DEFAULT_SWATCH_COLOR: &str = "#D4A373";

const PLACEHOLDER_NAMES: [&str; MAX_SWATCHES] = [
    "Living Room Vibe",
    "Kitchen Accent",
    "Bedroom Mood",
    "Sofa Oyen",
    "Sunset Corner",
];
const DARK_TEXT: &str = "#1a1a1a";
const LIGHT_TEXT: &str = "#ffffff";
const LUMINANCE_THRESHOLD: f32 = 0.55;

/// One mood-board entry: a color picked from a photo of the place it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swatch {
    /// Swatch identifier.
    pub id: Uuid,
    /// Downscaled photo as a data URL.
    pub photo: Option<String>,
    /// `#RRGGBB`
    pub color: String,
    /// Display name.
    pub name: String,
}

impl From<SwatchEntity> for Swatch {
    fn from(entity: SwatchEntity) -> Self {
        Self {
            id: entity.id,
            photo: entity.photo,
            color: entity.color,
            name: entity.name,
        }
    }
}

impl From<&Swatch> for SwatchEntity {
    fn from(swatch: &Swatch) -> Self {
        Self {
            id: swatch.id,
            photo: swatch.photo.clone(),
            color: swatch.color.clone(),
            name: swatch.name.clone(),
        }
    }
}

/// Raised when adding beyond [`MAX_SWATCHES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("palette already holds {MAX_SWATCHES} swatches")]
pub struct PaletteFull;

/// Ordered swatch list, insertion order preserved across removals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    swatches: IndexMap<Uuid, Swatch>,
}

impl Palette {
    /// Rebuild a palette from persisted entities, keeping at most [`MAX_SWATCHES`].
    pub fn from_entities(entities: Vec<SwatchEntity>) -> Self {
        let swatches = entities
            .into_iter()
            .take(MAX_SWATCHES)
            .map(|entity| (entity.id, Swatch::from(entity)))
            .collect();
        Self { swatches }
    }

    /// Persisted form, in palette order.
    pub fn to_entities(&self) -> Vec<SwatchEntity> {
        self.swatches.values().map(SwatchEntity::from).collect()
    }

    /// Number of swatches.
    pub fn len(&self) -> usize {
        self.swatches.len()
    }

    /// No swatch yet.
    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }

    /// Swatches in palette order.
    pub fn iter(&self) -> impl Iterator<Item = &Swatch> {
        self.swatches.values()
    }

    /// Swatch with `id`.
    pub fn get(&self, id: &Uuid) -> Option<&Swatch> {
        self.swatches.get(id)
    }

    /// Swatches that already carry a photo, in palette order.
    pub fn filled(&self) -> impl Iterator<Item = &Swatch> {
        self.swatches.values().filter(|swatch| swatch.photo.is_some())
    }

    /// Append a blank swatch with the default color and the next placeholder name.
    pub fn add(&mut self) -> Result<&Swatch, PaletteFull> {
        if self.swatches.len() >= MAX_SWATCHES {
            return Err(PaletteFull);
        }
        let swatch = Swatch {
            id: Uuid::new_v4(),
            photo: None,
            color: DEFAULT_SWATCH_COLOR.to_owned(),
            name: placeholder_name(self.swatches.len()),
        };
        let (index, _) = self.swatches.insert_full(swatch.id, swatch);
        // Just inserted.
        Ok(&self.swatches[index])
    }

    /// Apply a partial update; `None` fields are left untouched.
    pub fn update(
        &mut self,
        id: &Uuid,
        name: Option<String>,
        color: Option<String>,
    ) -> Option<&Swatch> {
        let swatch = self.swatches.get_mut(id)?;
        if let Some(name) = name {
            swatch.name = name;
        }
        if let Some(color) = color {
            swatch.color = color;
        }
        Some(swatch)
    }

    /// Attach `photo` to the swatch with `id`.
    pub fn set_photo(&mut self, id: &Uuid, photo: String) -> Option<&Swatch> {
        let swatch = self.swatches.get_mut(id)?;
        swatch.photo = Some(photo);
        Some(swatch)
    }

    /// Remove a swatch, keeping the order of the others.
    pub fn remove(&mut self, id: &Uuid) -> Option<Swatch> {
        self.swatches.shift_remove(id)
    }
}

/// Placeholder name for the swatch added at zero-based position `index`.
pub fn placeholder_name(index: usize) -> String {
    PLACEHOLDER_NAMES
        .get(index)
        .map(|name| (*name).to_owned())
        .unwrap_or_else(|| format!("Swatch {}", index + 1))
}

/// Parse `#RRGGBB` into its channels.
pub fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

/// Text color readable on top of `hex`.
pub fn contrast_color(hex: &str) -> &'static str {
    let Some([r, g, b]) = parse_hex_color(hex) else {
        return LIGHT_TEXT;
    };
    let luminance = (0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)) / 255.0;
    if luminance > LUMINANCE_THRESHOLD {
        DARK_TEXT
    } else {
        LIGHT_TEXT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_up_to_five_with_placeholder_names() {
        let mut palette = Palette::default();
        let names: Vec<String> = (0..MAX_SWATCHES)
            .map(|_| palette.add().unwrap().name.clone())
            .collect();
        assert_eq!(
            names,
            [
                "Living Room Vibe",
                "Kitchen Accent",
                "Bedroom Mood",
                "Sofa Oyen",
                "Sunset Corner"
            ]
        );
        assert!(palette.iter().all(|s| s.color == DEFAULT_SWATCH_COLOR));
        assert_eq!(palette.add(), Err(PaletteFull));
        assert_eq!(palette.len(), MAX_SWATCHES);
    }

    #[test]
    fn placeholder_falls_back_to_numbered_name() {
        assert_eq!(placeholder_name(5), "Swatch 6");
    }

    #[test]
    fn removal_keeps_order_and_frees_a_slot() {
        let mut palette = Palette::default();
        let ids: Vec<Uuid> = (0..3).map(|_| palette.add().unwrap().id).collect();
        palette.remove(&ids[0]).unwrap();
        let remaining: Vec<Uuid> = palette.iter().map(|s| s.id).collect();
        assert_eq!(remaining, vec![ids[1], ids[2]]);
        assert_eq!(palette.add().unwrap().name, "Bedroom Mood");
    }

    #[test]
    fn partial_update_touches_only_given_fields() {
        let mut palette = Palette::default();
        let id = palette.add().unwrap().id;
        let updated = palette.update(&id, None, Some("#112233".into())).unwrap();
        assert_eq!(updated.color, "#112233");
        assert_eq!(updated.name, "Living Room Vibe");
        assert!(palette.update(&Uuid::new_v4(), Some("x".into()), None).is_none());
    }

    #[test]
    fn filled_lists_only_photographed_swatches() {
        let mut palette = Palette::default();
        let first = palette.add().unwrap().id;
        palette.add().unwrap();
        palette.set_photo(&first, "data:image/jpeg;base64,AA".into());
        assert_eq!(palette.filled().map(|s| s.id).collect::<Vec<_>>(), vec![first]);
    }

    #[test]
    fn contrast_color_follows_luminance() {
        assert_eq!(contrast_color("#ffffff"), "#1a1a1a");
        assert_eq!(contrast_color("#000000"), "#ffffff");
        // 0.299*212 + 0.587*163 + 0.114*115 = 172.3 → 0.676
        assert_eq!(contrast_color("#D4A373"), "#1a1a1a");
        assert_eq!(contrast_color("#3E3C3C"), "#ffffff");
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_color("#D4A373"), Some([0xD4, 0xA3, 0x73]));
        assert_eq!(parse_hex_color("D4A373"), None);
        assert_eq!(parse_hex_color("#D4A37"), None);
        assert_eq!(parse_hex_color("#GGGGGG"), None);
    }

    #[test]
    fn entities_round_trip_in_order_and_are_capped() {
        let entities: Vec<SwatchEntity> = (0..7)
            .map(|i| SwatchEntity {
                id: Uuid::new_v4(),
                photo: None,
                color: "#000000".into(),
                name: format!("n{i}"),
            })
            .collect();
        let palette = Palette::from_entities(entities.clone());
        assert_eq!(palette.len(), MAX_SWATCHES);
        assert_eq!(palette.to_entities(), entities[..MAX_SWATCHES].to_vec());
    }
}
