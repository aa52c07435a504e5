use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::state::board::{CELL_COUNT, cell_id};

/// Persisted shape of one board cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CellRecord {
    /// Stable cell identifier (`tile-{index}`).
    #[serde(default)]
    pub id: String,
    /// Prompt shown on the cell.
    #[serde(default)]
    pub label: String,
    /// Encoded photo (data URL). Missing and `null` both mean "no photo yet".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Tilt hint in degrees for the polaroid frame.
    #[serde(default)]
    pub rotation: i8,
}

impl CellRecord {
    fn placeholder(index: usize) -> Self {
        Self {
            id: cell_id(index),
            ..Self::default()
        }
    }
}

/// Nested key/value record stored once per session in the board store.
///
/// `cells` is always normalized to exactly [`CELL_COUNT`] entries on the way in, whatever
/// shape the backend handed back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardRecord {
    /// Board cells in index order.
    #[serde(default = "placeholder_cells", deserialize_with = "normalize_cells")]
    pub cells: Vec<CellRecord>,
    /// Number of minor milestone rewards already fired.
    #[serde(default)]
    pub claimed_milestones: u32,
    /// Whether the full-board reward already fired.
    #[serde(default)]
    pub grand_prize_claimed: bool,
    /// A fired reward has not been dismissed yet.
    #[serde(default)]
    pub reward_pending: bool,
}

impl BoardRecord {
    /// Record with 9 blank cells and zeroed counters.
    pub fn empty() -> Self {
        Self {
            cells: placeholder_cells(),
            claimed_milestones: 0,
            grand_prize_claimed: false,
            reward_pending: false,
        }
    }

    /// Set a single field, leaving every sibling untouched.
    pub fn apply(&mut self, path: FieldPath, value: FieldValue) -> Result<(), FieldError> {
        match (path, value) {
            (FieldPath::CellPhoto(index), FieldValue::Photo(photo)) => {
                let cell = self
                    .cells
                    .get_mut(index)
                    .ok_or(FieldError::CellOutOfRange(index))?;
                cell.photo = photo;
            }
            (FieldPath::ClaimedMilestones, FieldValue::Counter(count)) => {
                self.claimed_milestones = count;
            }
            (FieldPath::GrandPrizeClaimed, FieldValue::Flag(flag)) => {
                self.grand_prize_claimed = flag;
            }
            (FieldPath::RewardPending, FieldValue::Flag(flag)) => {
                self.reward_pending = flag;
            }
            (FieldPath::RewardClaim, FieldValue::Claim(claim)) => {
                self.claimed_milestones = claim.claimed_milestones;
                self.grand_prize_claimed = claim.grand_prize_claimed;
                self.reward_pending = true;
            }
            (path, value) => return Err(FieldError::TypeMismatch { path, value }),
        }
        Ok(())
    }
}

/// Addressable field inside a [`BoardRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    /// `cells/{index}/photo`
    CellPhoto(usize),
    /// `claimed_milestones`
    ClaimedMilestones,
    /// `grand_prize_claimed`
    GrandPrizeClaimed,
    /// `reward_pending`
    RewardPending,
    /// `claimed_milestones`, `grand_prize_claimed` and `reward_pending` in one write.
    RewardClaim,
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::CellPhoto(index) => write!(f, "cells/{index}/photo"),
            FieldPath::ClaimedMilestones => f.write_str("claimed_milestones"),
            FieldPath::GrandPrizeClaimed => f.write_str("grand_prize_claimed"),
            FieldPath::RewardPending => f.write_str("reward_pending"),
            FieldPath::RewardClaim => f.write_str("reward_claim"),
        }
    }
}

/// Value written to a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Cell photo as a data URL, `None` to clear it.
    Photo(Option<String>),
    /// Absolute counter value.
    Counter(u32),
    /// Boolean flag.
    Flag(bool),
    /// Claim that also raises `reward_pending`.
    Claim(RewardClaim),
}

/// Absolute claim counters written together with the pending flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardClaim {
    /// Minor milestones claimed after this claim.
    pub claimed_milestones: u32,
    /// Whether the grand prize is claimed after this claim.
    pub grand_prize_claimed: bool,
}

/// Raised when a targeted write does not fit the record schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The cell index does not exist on a 9-cell board.
    #[error("cell index {0} is out of range")]
    CellOutOfRange(usize),
    /// The value kind does not match the addressed field.
    #[error("value {value:?} does not fit field `{path}`")]
    TypeMismatch {
        /// Field that was addressed.
        path: FieldPath,
        /// Value that was rejected.
        value: FieldValue,
    },
}

/// Origin marker attached to every board write so subscribers can recognise their own echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteTag(Uuid);

impl WriteTag {
    /// Fresh random tag.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WriteTag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WriteTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Palette swatch persisted in the local preference file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwatchEntity {
    /// Swatch identifier.
    pub id: Uuid,
    /// Downscaled photo as a data URL.
    #[serde(default)]
    pub photo: Option<String>,
    /// `#RRGGBB` color.
    pub color: String,
    /// Display name.
    pub name: String,
}

fn placeholder_cells() -> Vec<CellRecord> {
    (0..CELL_COUNT).map(CellRecord::placeholder).collect()
}

/// Accept `cells` as a dense array, a sparse array with `null` holes, or an object keyed by
/// index, and always produce [`CELL_COUNT`] ordered cells.
fn normalize_cells<'de, D>(deserializer: D) -> Result<Vec<CellRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let mut slots: Vec<Option<Value>> = vec![None; CELL_COUNT];

    match raw {
        Value::Null => {}
        Value::Array(items) => {
            for (index, item) in items.into_iter().take(CELL_COUNT).enumerate() {
                if !item.is_null() {
                    slots[index] = Some(item);
                }
            }
        }
        Value::Object(entries) => {
            for (key, item) in entries {
                match key.parse::<usize>() {
                    Ok(index) if index < CELL_COUNT && !item.is_null() => {
                        slots[index] = Some(item);
                    }
                    _ => {}
                }
            }
        }
        other => {
            return Err(D::Error::custom(format!(
                "expected cells array or object, got {other}"
            )));
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            let mut cell = match slot {
                Some(value) => serde_json::from_value::<CellRecord>(value)
                    .map_err(|err| D::Error::custom(format!("cell {index}: {err}")))?,
                None => CellRecord::placeholder(index),
            };
            if cell.id.is_empty() {
                cell.id = cell_id(index);
            }
            Ok(cell)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dense_array_round_trips() {
        let mut record = BoardRecord::empty();
        record.cells[2].photo = Some("p".into());
        record.claimed_milestones = 1;
        let value = serde_json::to_value(&record).unwrap();
        let parsed: BoardRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn object_keyed_cells_are_normalized_in_order() {
        let parsed: BoardRecord = serde_json::from_value(json!({
            "cells": {
                "4": {"id": "tile-4", "label": "center", "photo": "x", "rotation": 2},
                "0": {"id": "tile-0", "label": "corner"},
                "junk": {"id": "nope"},
                "12": {"id": "tile-12"}
            },
            "claimed_milestones": 2
        }))
        .unwrap();

        assert_eq!(parsed.cells.len(), CELL_COUNT);
        assert_eq!(parsed.cells[0].label, "corner");
        assert_eq!(parsed.cells[4].photo.as_deref(), Some("x"));
        assert_eq!(parsed.cells[4].rotation, 2);
        assert_eq!(parsed.cells[7].id, "tile-7");
        assert!(parsed.cells[7].photo.is_none());
        assert_eq!(parsed.claimed_milestones, 2);
    }

    #[test]
    fn sparse_array_with_holes_is_padded() {
        let parsed: BoardRecord = serde_json::from_value(json!({
            "cells": [null, {"label": "second", "photo": "y"}, null]
        }))
        .unwrap();

        assert_eq!(parsed.cells.len(), CELL_COUNT);
        assert_eq!(parsed.cells[1].id, "tile-1");
        assert_eq!(parsed.cells[1].photo.as_deref(), Some("y"));
        assert_eq!(parsed.cells[8], CellRecord::placeholder(8));
        assert!(!parsed.reward_pending);
    }

    #[test]
    fn missing_cells_field_yields_blank_board() {
        let parsed: BoardRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed, BoardRecord::empty());
    }

    #[test]
    fn scalar_cells_are_rejected() {
        assert!(serde_json::from_value::<BoardRecord>(json!({"cells": 3})).is_err());
    }

    #[test]
    fn apply_sets_only_the_targeted_field() {
        let mut record = BoardRecord::empty();
        record
            .apply(FieldPath::CellPhoto(5), FieldValue::Photo(Some("z".into())))
            .unwrap();
        record
            .apply(FieldPath::RewardPending, FieldValue::Flag(true))
            .unwrap();

        assert_eq!(record.cells[5].photo.as_deref(), Some("z"));
        assert!(record.cells.iter().enumerate().all(|(i, c)| i == 5 || c.photo.is_none()));
        assert!(record.reward_pending);
        assert_eq!(record.claimed_milestones, 0);
    }

    #[test]
    fn apply_rejects_bad_paths_and_types() {
        let mut record = BoardRecord::empty();
        assert_eq!(
            record.apply(FieldPath::CellPhoto(9), FieldValue::Photo(None)),
            Err(FieldError::CellOutOfRange(9))
        );
        assert!(matches!(
            record.apply(FieldPath::ClaimedMilestones, FieldValue::Flag(true)),
            Err(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn claim_sets_counters_and_pending_together() {
        let mut record = BoardRecord::empty();
        record
            .apply(
                FieldPath::RewardClaim,
                FieldValue::Claim(RewardClaim {
                    claimed_milestones: 2,
                    grand_prize_claimed: false,
                }),
            )
            .unwrap();
        assert_eq!(record.claimed_milestones, 2);
        assert!(!record.grand_prize_claimed);
        assert!(record.reward_pending);

        assert!(matches!(
            record.apply(FieldPath::RewardClaim, FieldValue::Flag(true)),
            Err(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn field_paths_render_as_nested_keys() {
        assert_eq!(FieldPath::CellPhoto(3).to_string(), "cells/3/photo");
        assert_eq!(FieldPath::RewardPending.to_string(), "reward_pending");
    }
}
