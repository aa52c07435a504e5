//! Celebration plans for captures and unlocked rewards.

use crate::{
    dto::reward::{Celebration, ConfettiBurst, RewardPresentation},
    state::{engine::Award, rewards::RewardTier},
};

const ACCENT: &str = "#E29578";
const SAND: &str = "#D4A373";
const PAPER: &str = "#F9F5F1";
const STRAIGHT_UP: u32 = 90;

fn burst(
    particle_count: u32,
    spread: u32,
    angle: u32,
    origin: (f32, f32),
    delay_ms: u32,
    colors: &[&str],
) -> ConfettiBurst {
    ConfettiBurst {
        particle_count,
        spread,
        angle,
        origin_x: origin.0,
        origin_y: origin.1,
        delay_ms,
        colors: colors.iter().map(|c| (*c).to_owned()).collect(),
    }
}

/// Main burst and two side cannons, then the modal.
fn milestone_celebration() -> Celebration {
    Celebration {
        bursts: vec![
            burst(200, 120, STRAIGHT_UP, (0.5, 0.5), 300, &[ACCENT, SAND, PAPER]),
            burst(120, 60, 60, (0.0, 0.5), 500, &[ACCENT, SAND]),
            burst(120, 60, 120, (1.0, 0.5), 650, &[ACCENT, SAND]),
        ],
        modal_delay_ms: Some(800),
    }
}

/// Three waves ending in a finale; the modal opens between the first two.
fn grand_prize_celebration() -> Celebration {
    Celebration {
        bursts: vec![
            burst(300, 160, STRAIGHT_UP, (0.5, 0.5), 300, &[ACCENT, SAND, PAPER]),
            burst(180, 70, 60, (0.0, 0.6), 500, &[ACCENT, SAND]),
            burst(180, 70, 120, (1.0, 0.6), 650, &[ACCENT, SAND]),
            burst(250, 140, STRAIGHT_UP, (0.3, 0.4), 1_500, &[ACCENT, PAPER]),
            burst(250, 140, STRAIGHT_UP, (0.7, 0.4), 1_800, &[SAND, PAPER]),
            burst(180, 70, 60, (0.0, 0.5), 2_200, &[ACCENT, SAND]),
            burst(180, 70, 120, (1.0, 0.5), 2_350, &[ACCENT, SAND]),
            burst(400, 180, STRAIGHT_UP, (0.5, 0.4), 3_200, &[ACCENT, SAND, PAPER]),
        ],
        modal_delay_ms: Some(1_200),
    }
}

/// Small burst for a capture that unlocks nothing.
pub fn fill_celebration() -> Celebration {
    Celebration {
        bursts: vec![burst(30, 50, STRAIGHT_UP, (0.5, 0.7), 0, &[ACCENT, SAND])],
        modal_delay_ms: None,
    }
}

/// Build what the recipient sees for `award`.
pub fn present(award: &Award) -> RewardPresentation {
    let celebration = match award.tier {
        RewardTier::Minor { .. } => milestone_celebration(),
        RewardTier::Grand => grand_prize_celebration(),
    };
    RewardPresentation {
        tier: award.tier,
        reward: award.reward.clone(),
        celebration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::rewards::RewardCatalog;

    fn last_burst_ms(celebration: &Celebration) -> u32 {
        celebration
            .bursts
            .iter()
            .map(|b| b.delay_ms)
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn milestone_plan_is_short_and_opens_modal() {
        let catalog = RewardCatalog::default();
        let award = Award {
            tier: RewardTier::Minor { index: 0 },
            reward: catalog.milestones()[0].clone(),
        };
        let presentation = present(&award);
        assert_eq!(presentation.reward.unlock_code, "BINGO-ONE");
        assert_eq!(presentation.celebration.bursts.len(), 3);
        assert!(last_burst_ms(&presentation.celebration) <= 1_500);
        assert_eq!(presentation.celebration.modal_delay_ms, Some(800));
    }

    #[test]
    fn grand_prize_plan_is_bigger_but_bounded() {
        let catalog = RewardCatalog::default();
        let award = Award {
            tier: RewardTier::Grand,
            reward: catalog.grand_prize().clone(),
        };
        let grand = present(&award).celebration;
        let minor = milestone_celebration();
        let total = |c: &Celebration| c.bursts.iter().map(|b| b.particle_count).sum::<u32>();
        assert!(total(&grand) > total(&minor));
        assert!(last_burst_ms(&grand) <= 4_000);
        assert!(grand.modal_delay_ms.is_some());
    }

    #[test]
    fn plain_capture_gets_a_single_small_burst() {
        let celebration = fill_celebration();
        assert_eq!(celebration.bursts.len(), 1);
        assert_eq!(celebration.bursts[0].particle_count, 30);
        assert!(celebration.modal_delay_ms.is_none());
    }
}
