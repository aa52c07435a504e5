//! Pure win detection and reward selection for the bingo board.
//!
//! Every function here works on a snapshot fetched from the board store right before the
//! decision is made; nothing reads cached client state.

use crate::state::{
    board::{BoardCell, BoardState, CELL_COUNT},
    rewards::{Reward, RewardCatalog, RewardTier},
};

/// Three cell indices forming a winning combination.
pub type Line = [usize; 3];

/// Rows, columns, then diagonals.
pub const LINES: [Line; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Reward chosen for a single capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    /// Milestone index or grand prize.
    pub tier: RewardTier,
    /// Catalog entry shown to the player.
    pub reward: Reward,
}

/// Outcome of evaluating one capture against a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDecision {
    /// Every line complete in the snapshot.
    pub completed_lines: Vec<Line>,
    /// At most one reward per capture.
    pub award: Option<Award>,
}

/// Lines whose three cells all carry a photo.
pub fn find_completed_lines(cells: &[BoardCell]) -> Vec<Line> {
    LINES
        .iter()
        .filter(|line| {
            line.iter()
                .all(|&index| cells.get(index).is_some_and(BoardCell::has_photo))
        })
        .copied()
        .collect()
}

/// Next minor reward, if this capture completed at least one new line.
///
/// The tier is `milestones[claimed]`; nothing fires once the catalog is exhausted or while a
/// previous reward is still on screen.
pub fn next_milestone_reward(
    prior_completed: usize,
    new_completed: usize,
    claimed: u32,
    reward_pending: bool,
    milestones: &[Reward],
) -> Option<&Reward> {
    if new_completed <= prior_completed || reward_pending {
        return None;
    }
    milestones.get(usize::try_from(claimed).ok()?)
}

/// The grand prize when every cell is filled and it has not been claimed yet.
pub fn grand_prize_reward(
    filled_cells: usize,
    already_claimed: bool,
    grand_prize: &Reward,
) -> Option<&Reward> {
    (filled_cells >= CELL_COUNT && !already_claimed).then_some(grand_prize)
}

/// Decide the reward (if any) earned by capturing `captured_index` in `snapshot`.
///
/// Lines that did not need the captured cell were already complete before it, so the prior
/// count comes from the same snapshot. The grand prize wins over a simultaneous milestone.
pub fn evaluate_capture(
    snapshot: &BoardState,
    captured_index: usize,
    catalog: &RewardCatalog,
) -> CaptureDecision {
    let completed_lines = find_completed_lines(&snapshot.cells);
    let prior_completed = completed_lines
        .iter()
        .filter(|line| !line.contains(&captured_index))
        .count();

    let award = if let Some(reward) = grand_prize_reward(
        snapshot.filled_count(),
        snapshot.grand_prize_claimed,
        catalog.grand_prize(),
    ) {
        Some(Award {
            tier: RewardTier::Grand,
            reward: reward.clone(),
        })
    } else {
        next_milestone_reward(
            prior_completed,
            completed_lines.len(),
            snapshot.claimed_milestones,
            snapshot.reward_pending,
            catalog.milestones(),
        )
        .map(|reward| Award {
            tier: RewardTier::Minor {
                index: snapshot.claimed_milestones,
            },
            reward: reward.clone(),
        })
    };

    CaptureDecision {
        completed_lines,
        award,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(filled: &[usize]) -> BoardState {
        let labels: Vec<String> = (0..CELL_COUNT).map(|i| format!("prompt {i}")).collect();
        let mut board = BoardState::fresh(&labels);
        for &index in filled {
            board.cells[index].photo = Some(format!("data:image/jpeg;base64,{index}"));
        }
        board
    }

    /// Apply the claim writes the board service performs after an award.
    fn claim(board: &mut BoardState, award: &Award) {
        match award.tier {
            RewardTier::Minor { .. } => board.claimed_milestones += 1,
            RewardTier::Grand => board.grand_prize_claimed = true,
        }
        board.reward_pending = true;
    }

    #[test]
    fn empty_board_has_no_lines() {
        assert!(find_completed_lines(&board_with(&[]).cells).is_empty());
    }

    #[test]
    fn all_but_center_completes_top_and_bottom_rows_only() {
        let board = board_with(&[0, 1, 2, 3, 5, 6, 7, 8]);
        assert_eq!(
            find_completed_lines(&board.cells),
            vec![[0, 1, 2], [6, 7, 8]]
        );
    }

    #[test]
    fn every_line_is_detected_alone() {
        for line in LINES {
            let board = board_with(&line);
            assert_eq!(find_completed_lines(&board.cells), vec![line]);
        }
    }

    #[test]
    fn two_of_three_is_not_a_line() {
        let board = board_with(&[0, 1, 4, 8]);
        assert!(find_completed_lines(&board.cells).is_empty());
    }

    #[test]
    fn short_cell_slice_never_completes_missing_indices() {
        let board = board_with(&[0, 1, 2, 6, 7, 8]);
        assert_eq!(find_completed_lines(&board.cells[..6]), vec![[0, 1, 2]]);
    }

    #[test]
    fn milestone_requires_new_line() {
        let catalog = RewardCatalog::default();
        assert!(next_milestone_reward(1, 1, 0, false, catalog.milestones()).is_none());
        assert!(next_milestone_reward(0, 1, 0, true, catalog.milestones()).is_none());
        assert_eq!(
            next_milestone_reward(0, 1, 0, false, catalog.milestones()),
            Some(&catalog.milestones()[0])
        );
        let exhausted = catalog.milestones().len() as u32;
        assert!(next_milestone_reward(0, 2, exhausted, false, catalog.milestones()).is_none());
    }

    #[test]
    fn grand_prize_only_for_full_unclaimed_board() {
        let grand = RewardCatalog::default().grand_prize().clone();
        assert!(grand_prize_reward(8, false, &grand).is_none());
        assert!(grand_prize_reward(9, true, &grand).is_none());
        assert_eq!(grand_prize_reward(9, false, &grand), Some(&grand));
    }

    #[test]
    fn capture_completing_a_line_awards_first_milestone() {
        let catalog = RewardCatalog::default();
        let board = board_with(&[0, 1, 2]);
        let decision = evaluate_capture(&board, 2, &catalog);
        assert_eq!(decision.completed_lines, vec![[0, 1, 2]]);
        let award = decision.award.expect("milestone");
        assert_eq!(award.tier, RewardTier::Minor { index: 0 });
        assert_eq!(award.reward, catalog.milestones()[0]);
    }

    #[test]
    fn capture_outside_new_lines_awards_nothing() {
        let catalog = RewardCatalog::default();
        let mut board = board_with(&[0, 1, 2, 4]);
        board.claimed_milestones = 1;
        let decision = evaluate_capture(&board, 4, &catalog);
        assert_eq!(decision.completed_lines.len(), 1);
        assert!(decision.award.is_none());
    }

    #[test]
    fn milestones_unlock_in_catalog_order() {
        let catalog = RewardCatalog::default();
        let mut board = board_with(&[]);
        let mut fired = Vec::new();

        // Each step completes a new line: rows, then the first column finishes the board.
        for index in [0, 1, 2, 3, 4, 5, 6, 7, 8] {
            board.cells[index].photo = Some("photo".into());
            let decision = evaluate_capture(&board, index, &catalog);
            if let Some(award) = decision.award {
                claim(&mut board, &award);
                fired.push(award);
                // dismissal
                board.reward_pending = false;
            }
        }

        let minors: Vec<_> = fired
            .iter()
            .filter(|award| matches!(award.tier, RewardTier::Minor { .. }))
            .collect();
        for (k, award) in minors.iter().enumerate() {
            assert_eq!(award.reward, catalog.milestones()[k]);
            assert_eq!(award.tier, RewardTier::Minor { index: k as u32 });
        }
        assert!(minors.len() <= catalog.milestones().len());
        assert_eq!(fired.last().map(|a| a.tier), Some(RewardTier::Grand));
    }

    #[test]
    fn last_cell_yields_grand_prize_not_milestone() {
        let catalog = RewardCatalog::default();
        let board = board_with(&[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        let decision = evaluate_capture(&board, 4, &catalog);
        let award = decision.award.expect("grand prize");
        assert_eq!(award.tier, RewardTier::Grand);
        assert_eq!(&award.reward, catalog.grand_prize());
    }

    #[test]
    fn grand_prize_fires_even_while_a_reward_is_pending() {
        let catalog = RewardCatalog::default();
        let mut board = board_with(&[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        board.reward_pending = true;
        let decision = evaluate_capture(&board, 8, &catalog);
        assert_eq!(decision.award.map(|a| a.tier), Some(RewardTier::Grand));
    }

    #[test]
    fn claimed_grand_prize_never_refires() {
        let catalog = RewardCatalog::default();
        let mut board = board_with(&[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        board.grand_prize_claimed = true;
        board.claimed_milestones = catalog.milestones().len() as u32;
        assert!(evaluate_capture(&board, 8, &catalog).award.is_none());
    }
}
