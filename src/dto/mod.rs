use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod board;
pub mod gate;
pub mod health;
pub mod palette;
pub mod reward;
pub mod sse;
pub mod validation;

fn format_instant(instant: OffsetDateTime) -> String {
    instant
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
