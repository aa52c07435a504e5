use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::dto::format_instant;

/// Time remaining before the unlock instant, clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TimeLeft {
    /// Whole days.
    pub days: u64,
    /// Hours past the whole days, `0..24`.
    pub hours: u64,
    /// Minutes, `0..60`.
    pub minutes: u64,
    /// Seconds, `0..60`.
    pub seconds: u64,
}

impl TimeLeft {
    /// Split a whole number of seconds into days, hours, minutes and seconds.
    pub fn from_seconds(total: u64) -> Self {
        Self {
            days: total / 86_400,
            hours: (total / 3_600) % 24,
            minutes: (total / 60) % 60,
            seconds: total % 60,
        }
    }

    /// Inverse of [`TimeLeft::from_seconds`].
    pub fn total_seconds(&self) -> u64 {
        self.days * 86_400 + self.hours * 3_600 + self.minutes * 60 + self.seconds
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Lock screen view model.
pub struct GateStatus {
    /// The unlock instant has passed.
    pub unlocked: bool,
    /// RFC 3339 unlock instant.
    pub unlock_at: String,
    /// Teaser shown above the countdown.
    pub message: String,
    /// Countdown until `unlock_at`.
    pub remaining: TimeLeft,
    /// Less than one hour left and still locked.
    pub almost_time: bool,
}

impl GateStatus {
    /// Assemble the lock screen view, formatting `unlock_at` as RFC 3339.
    pub fn new(
        unlocked: bool,
        unlock_at: OffsetDateTime,
        message: String,
        remaining: TimeLeft,
        almost_time: bool,
    ) -> Self {
        Self {
            unlocked,
            unlock_at: format_instant(unlock_at),
            message,
            remaining,
            almost_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Reply to a knock on the lock screen.
pub struct KnockResponse {
    /// Reply shown under the lock.
    pub message: String,
    /// Knocks received by this server since start-up.
    pub knocks: u64,
}
