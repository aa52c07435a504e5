use thiserror::Error;

use crate::state::{board::BoardState, rewards::RewardTier};

/// Reward phases a shared board can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardPhase {
    /// No reward is on screen; captures may unlock the next tier.
    Idle,
    /// A minor reward was unlocked and has not been dismissed yet.
    RewardPending,
    /// The grand prize was unlocked; terminal until the board is reset.
    GrandPrizeAwarded,
}

impl BoardPhase {
    /// Derive the phase from a board snapshot.
    pub fn of(board: &BoardState) -> Self {
        if board.grand_prize_claimed {
            BoardPhase::GrandPrizeAwarded
        } else if board.reward_pending {
            BoardPhase::RewardPending
        } else {
            BoardPhase::Idle
        }
    }
}

/// Events that drive the board phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    /// A cell received its photo, unlocking `reward` if any.
    CellFilled { reward: Option<RewardTier> },
    /// The recipient closed the reward modal.
    RewardDismissed,
    /// The whole board was wiped.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the board was in when the invalid event was received.
    pub from: BoardPhase,
    /// The event that cannot be applied from this phase.
    pub event: BoardEvent,
}

/// Compute the phase reached by applying `event` in phase `from`.
pub fn transition(from: BoardPhase, event: BoardEvent) -> Result<BoardPhase, InvalidTransition> {
    let next = match (from, event) {
        (_, BoardEvent::Reset) => BoardPhase::Idle,
        (
            BoardPhase::Idle | BoardPhase::RewardPending,
            BoardEvent::CellFilled {
                reward: Some(RewardTier::Grand),
            },
        ) => BoardPhase::GrandPrizeAwarded,
        (
            BoardPhase::Idle,
            BoardEvent::CellFilled {
                reward: Some(RewardTier::Minor { .. }),
            },
        ) => BoardPhase::RewardPending,
        (
            phase @ (BoardPhase::Idle | BoardPhase::RewardPending),
            BoardEvent::CellFilled { reward: None },
        ) => phase,
        (BoardPhase::RewardPending, BoardEvent::RewardDismissed) => BoardPhase::Idle,
        (BoardPhase::GrandPrizeAwarded, BoardEvent::RewardDismissed) => {
            BoardPhase::GrandPrizeAwarded
        }
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}
