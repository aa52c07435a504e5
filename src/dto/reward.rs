use serde::Serialize;
use utoipa::ToSchema;

use crate::state::rewards::{Reward, RewardTier};

/// One confetti burst fired by the client.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ConfettiBurst {
    /// Particles in this burst.
    pub particle_count: u32,
    /// Spread of the cone, in degrees.
    pub spread: u32,
    /// Launch angle in degrees (90 is straight up).
    pub angle: u32,
    /// Horizontal origin in `[0, 1]` of the viewport width.
    pub origin_x: f32,
    /// Vertical origin in `[0, 1]` of the viewport height.
    pub origin_y: f32,
    /// Delay after the capture before this burst fires.
    pub delay_ms: u32,
    /// Particle colors as `#RRGGBB`.
    pub colors: Vec<String>,
}

/// Celebration plan attached to a capture.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Celebration {
    /// Bursts in firing order.
    pub bursts: Vec<ConfettiBurst>,
    /// When the reward modal should open, if one is shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modal_delay_ms: Option<u32>,
}

/// Reward as displayed to the recipient, with its celebration.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RewardPresentation {
    /// Which reward fired.
    pub tier: RewardTier,
    /// Catalog entry with its unlock code.
    pub reward: Reward,
    /// Confetti plan and modal delay.
    pub celebration: Celebration,
}

#[derive(Debug, Serialize, ToSchema)]
/// Currently displayed reward of a session, `null` when none is on screen.
pub struct RewardSlotResponse {
    /// Reward on screen.
    pub reward: Option<RewardPresentation>,
}
