use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dto::{
        reward::{Celebration, RewardPresentation},
        validation::validate_session_id,
    },
    error::ServiceError,
    state::{
        board::{BoardCell, BoardState, SessionId},
        engine::{Line, find_completed_lines},
        state_machine::BoardPhase,
    },
};

/// `{id}` segment of every session route.
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct SessionPath {
    /// Session identifier shared by every client of one board.
    #[validate(custom(function = "validate_session_id"))]
    pub id: String,
}

impl SessionPath {
    /// Parsed session identifier.
    pub fn session(&self) -> Result<SessionId, ServiceError> {
        Ok(SessionId::parse(&self.id)?)
    }
}

/// `{id}/cells/{index}` segments of the capture route.
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct CellPath {
    /// Session identifier.
    #[validate(custom(function = "validate_session_id"))]
    pub id: String,
    /// Zero-based grid index, row-major.
    pub index: usize,
}

impl CellPath {
    /// Parsed session identifier.
    pub fn session(&self) -> Result<SessionId, ServiceError> {
        Ok(SessionId::parse(&self.id)?)
    }
}

/// Reward phase of a board as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisibleBoardPhase {
    /// Nothing on screen; the next line may fire a milestone.
    Idle,
    /// A milestone is waiting to be dismissed.
    RewardPending,
    /// The full-board reward fired.
    GrandPrizeAwarded,
}

impl From<BoardPhase> for VisibleBoardPhase {
    fn from(phase: BoardPhase) -> Self {
        match phase {
            BoardPhase::Idle => VisibleBoardPhase::Idle,
            BoardPhase::RewardPending => VisibleBoardPhase::RewardPending,
            BoardPhase::GrandPrizeAwarded => VisibleBoardPhase::GrandPrizeAwarded,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// One cell of the board.
pub struct CellView {
    /// Stable cell identifier.
    pub id: String,
    /// Prompt printed on the cell.
    pub label: String,
    /// JPEG data URL, omitted until captured.
    pub photo: Option<String>,
    /// Polaroid tilt in degrees.
    pub rotation_hint: i8,
    /// Whether the cell belongs to at least one completed line.
    pub winning: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// Full board snapshot sent to clients.
pub struct BoardView {
    /// Session the board belongs to.
    pub session: String,
    /// Nine cells in grid order.
    pub cells: Vec<CellView>,
    /// Cells carrying a photo.
    pub filled: usize,
    /// Every complete row, column and diagonal.
    #[schema(value_type = Vec<Vec<u32>>)]
    pub completed_lines: Vec<Line>,
    /// Minor milestones fired so far.
    pub claimed_milestones: u32,
    /// Whether the full-board reward fired.
    pub grand_prize_claimed: bool,
    /// A reward still waits for dismissal.
    pub reward_pending: bool,
    /// Reward phase derived from the flags above.
    pub phase: VisibleBoardPhase,
}

impl BoardView {
    /// Client view of `board`.
    pub fn new(session: &SessionId, board: &BoardState) -> Self {
        let completed_lines = find_completed_lines(&board.cells);
        let cells = board
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let in_line = completed_lines.iter().any(|line| line.contains(&index));
                cell_view(cell, in_line)
            })
            .collect();

        Self {
            session: session.to_string(),
            cells,
            filled: board.filled_count(),
            completed_lines,
            claimed_milestones: board.claimed_milestones,
            grand_prize_claimed: board.grand_prize_claimed,
            reward_pending: board.reward_pending,
            phase: BoardPhase::of(board).into(),
        }
    }
}

fn cell_view(cell: &BoardCell, winning: bool) -> CellView {
    CellView {
        id: cell.id.clone(),
        label: cell.label.clone(),
        photo: cell.photo.clone(),
        rotation_hint: cell.rotation_hint,
        winning,
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
/// Result of a photo capture.
pub struct CaptureResponse {
    /// Board as re-read after every write of this capture.
    pub board: BoardView,
    /// Index of the captured cell.
    pub index: usize,
    /// Reward unlocked by this capture, if any.
    pub reward: Option<RewardPresentation>,
    /// Burst plan for the client.
    pub celebration: Celebration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_marks_winning_cells_and_phase() {
        let labels: Vec<String> = (0..9).map(|i| format!("p{i}")).collect();
        let mut board = BoardState::fresh(&labels);
        for index in [0, 1, 2, 5] {
            board.cells[index].photo = Some(format!("photo-{index}"));
        }
        board.reward_pending = true;
        let session = SessionId::parse("s").unwrap();

        let view = BoardView::new(&session, &board);
        assert_eq!(view.filled, 4);
        assert_eq!(view.completed_lines, vec![[0, 1, 2]]);
        assert!(view.cells[0].winning && view.cells[2].winning);
        assert!(!view.cells[5].winning);
        assert_eq!(view.phase, VisibleBoardPhase::RewardPending);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"], "reward_pending");
        assert!(json["cells"][4].get("photo").is_none());
    }
}
