use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Static reward entry unlocked by completing lines or the full board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Reward {
    /// Headline of the reward modal.
    pub title: String,
    /// What the recipient gets.
    pub description: String,
    /// Code the recipient shows to redeem the reward.
    pub unlock_code: String,
}

/// Which part of the catalog a reward came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum RewardTier {
    /// Minor milestone at zero-based catalog `index`.
    Minor {
        /// Position in [`RewardCatalog::milestones`].
        index: u32,
    },
    /// Terminal reward for filling every cell.
    Grand,
}

/// Reward catalog: ordered minor milestones plus the grand prize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardCatalog {
    milestones: Vec<Reward>,
    grand_prize: Reward,
}

impl RewardCatalog {
    /// Catalog firing `milestones` in order, then `grand_prize` on a full board.
    pub fn new(milestones: Vec<Reward>, grand_prize: Reward) -> Self {
        Self {
            milestones,
            grand_prize,
        }
    }

    /// Minor tiers in unlock order.
    pub fn milestones(&self) -> &[Reward] {
        &self.milestones
    }

    /// Reward for filling every cell.
    pub fn grand_prize(&self) -> &Reward {
        &self.grand_prize
    }
}

impl Default for RewardCatalog {
    fn default() -> Self {
        Self {
            milestones: vec![
                reward(
                    "First Line!",
                    "Meatballs are on me at the restaurant upstairs.",
                    "BINGO-ONE",
                ),
                reward(
                    "Double Line",
                    "You pick the dessert, no questions asked.",
                    "BINGO-TWO",
                ),
                reward(
                    "Triple Line",
                    "One plushie of your choice comes home with us.",
                    "BINGO-THREE",
                ),
            ],
            grand_prize: reward(
                "Full House",
                "Every prompt captured. The big surprise is yours.",
                "BINGO-FULL-HOUSE",
            ),
        }
    }
}

fn reward(title: &str, description: &str, unlock_code: &str) -> Reward {
    Reward {
        title: title.to_owned(),
        description: description.to_owned(),
        unlock_code: unlock_code.to_owned(),
    }
}
