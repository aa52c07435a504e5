use std::fmt;

use rand::Rng;
use thiserror::Error;

use crate::dao::models::{BoardRecord, CellRecord};

/// Number of cells on a bingo board (3×3 grid).
pub const CELL_COUNT: usize = 9;
/// Longest session identifier accepted by the board routes.
pub const SESSION_ID_MAX_LEN: usize = 64;
/// Bound (inclusive, both signs) of the decorative rotation applied to a cell.
const ROTATION_SPREAD: i8 = 4;

/// Identifier of one shared bingo board.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

/// Raised when a session identifier contains characters outside `[A-Za-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid session id `{0}`")]
pub struct InvalidSessionId(pub String);

impl SessionId {
    /// Validate and wrap a raw session identifier.
    pub fn parse(raw: &str) -> Result<Self, InvalidSessionId> {
        if is_valid_session_id(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(InvalidSessionId(raw.to_owned()))
        }
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check the session identifier charset and length.
pub fn is_valid_session_id(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= SESSION_ID_MAX_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// One prompt on the bingo board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardCell {
    /// Stable identifier (`tile-{index}`).
    pub id: String,
    /// Static prompt text.
    pub label: String,
    /// Encoded photo, once captured.
    pub photo: Option<String>,
    /// Decorative tilt chosen when the board was created.
    pub rotation_hint: i8,
}

impl BoardCell {
    /// Whether a photo has been captured for this prompt.
    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }
}

/// Full state of one shared board, as fetched from the board store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    /// Exactly [`CELL_COUNT`] cells in grid order.
    pub cells: Vec<BoardCell>,
    /// Number of minor reward tiers already unlocked.
    pub claimed_milestones: u32,
    /// Whether the full-house reward has been unlocked.
    pub grand_prize_claimed: bool,
    /// Set while an unlocked reward has not been dismissed yet.
    pub reward_pending: bool,
}

impl BoardState {
    /// Build a brand-new board with the given prompts and random rotation hints.
    pub fn fresh(labels: &[String]) -> Self {
        let mut rng = rand::rng();
        let cells = (0..CELL_COUNT)
            .map(|index| BoardCell {
                id: cell_id(index),
                label: labels.get(index).cloned().unwrap_or_default(),
                photo: None,
                rotation_hint: rng.random_range(-ROTATION_SPREAD..=ROTATION_SPREAD),
            })
            .collect();

        Self {
            cells,
            claimed_milestones: 0,
            grand_prize_claimed: false,
            reward_pending: false,
        }
    }

    /// Turn a normalized store record into board state, filling blank labels from `labels`.
    pub fn from_record(record: BoardRecord, labels: &[String]) -> Self {
        let cells = record
            .cells
            .into_iter()
            .take(CELL_COUNT)
            .enumerate()
            .map(|(index, cell)| BoardCell {
                id: if cell.id.is_empty() {
                    cell_id(index)
                } else {
                    cell.id
                },
                label: if cell.label.is_empty() {
                    labels.get(index).cloned().unwrap_or_default()
                } else {
                    cell.label
                },
                photo: cell.photo,
                rotation_hint: cell.rotation.clamp(-ROTATION_SPREAD, ROTATION_SPREAD),
            })
            .collect();

        Self {
            cells,
            claimed_milestones: record.claimed_milestones,
            grand_prize_claimed: record.grand_prize_claimed,
            reward_pending: record.reward_pending,
        }
    }

    /// Number of cells that carry a photo.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.has_photo()).count()
    }

    /// Whether every cell carries a photo.
    pub fn is_full(&self) -> bool {
        self.filled_count() == CELL_COUNT
    }

    /// Borrow a cell by grid index.
    pub fn cell(&self, index: usize) -> Option<&BoardCell> {
        self.cells.get(index)
    }
}

impl From<BoardState> for BoardRecord {
    fn from(state: BoardState) -> Self {
        Self {
            cells: state
                .cells
                .into_iter()
                .map(|cell| CellRecord {
                    id: cell.id,
                    label: cell.label,
                    photo: cell.photo,
                    rotation: cell.rotation_hint,
                })
                .collect(),
            claimed_milestones: state.claimed_milestones,
            grand_prize_claimed: state.grand_prize_claimed,
            reward_pending: state.reward_pending,
        }
    }
}

/// Identifier given to the cell at `index`.
pub fn cell_id(index: usize) -> String {
    format!("tile-{index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        (0..CELL_COUNT).map(|i| format!("prompt {i}")).collect()
    }

    #[test]
    fn fresh_board_is_empty_and_ordered() {
        let board = BoardState::fresh(&labels());
        assert_eq!(board.cells.len(), CELL_COUNT);
        assert_eq!(board.filled_count(), 0);
        assert_eq!(board.claimed_milestones, 0);
        assert!(!board.grand_prize_claimed);
        for (index, cell) in board.cells.iter().enumerate() {
            assert_eq!(cell.id, format!("tile-{index}"));
            assert_eq!(cell.label, format!("prompt {index}"));
            assert!((-4..=4).contains(&cell.rotation_hint));
        }
    }

    #[test]
    fn blank_record_cells_take_configured_labels() {
        let record = BoardRecord::empty();
        let board = BoardState::from_record(record, &labels());
        assert_eq!(board.cells[3].id, "tile-3");
        assert_eq!(board.cells[3].label, "prompt 3");
    }

    #[test]
    fn session_id_charset() {
        assert!(SessionId::parse("ikea-date_2026").is_ok());
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("has space").is_err());
        assert!(SessionId::parse("slash/inside").is_err());
        assert!(SessionId::parse(&"x".repeat(SESSION_ID_MAX_LEN + 1)).is_err());
    }
}
