//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::{
    board::{SESSION_ID_MAX_LEN, is_valid_session_id},
    palette::parse_hex_color,
};

/// Validates that a session ID is 1 to 64 characters of `[A-Za-z0-9_-]`.
///
/// # Examples
///
/// ```ignore
/// validate_session_id("ikea-2026")   // Ok
/// validate_session_id("ikea 2026")   // Err - space
/// validate_session_id("")            // Err - empty
/// ```
pub fn validate_session_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > SESSION_ID_MAX_LEN {
        let mut err = ValidationError::new("session_id_length");
        err.message = Some(
            format!(
                "Session ID must be 1 to {SESSION_ID_MAX_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !is_valid_session_id(id) {
        let mut err = ValidationError::new("session_id_format");
        err.message = Some("Session ID may only contain letters, digits, '-' and '_'".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a `#RRGGBB` color.
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    if parse_hex_color(color).is_none() {
        let mut err = ValidationError::new("hex_color");
        err.message = Some("Color must look like #RRGGBB".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_id_valid() {
        assert!(validate_session_id("ikea-2026").is_ok());
        assert!(validate_session_id("A_b-9").is_ok());
        assert!(validate_session_id(&"x".repeat(SESSION_ID_MAX_LEN)).is_ok());
    }

    #[test]
    fn test_validate_session_id_invalid_length() {
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id(&"x".repeat(SESSION_ID_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_session_id_invalid_format() {
        assert!(validate_session_id("ikea 2026").is_err());
        assert!(validate_session_id("../etc").is_err());
        assert!(validate_session_id("café").is_err());
    }

    #[test]
    fn test_validate_hex_color() {
        assert!(validate_hex_color("#D4A373").is_ok());
        assert!(validate_hex_color("#d4a373").is_ok());
        assert!(validate_hex_color("D4A373").is_err());
        assert!(validate_hex_color("#D4A3").is_err());
        assert!(validate_hex_color("#ZZZZZZ").is_err());
    }
}
