//! Validation helpers for DTOs.

use validator::ValidationError;

/// Maximum number of characters accepted for a player name.
const MAX_NAME_CHARS: usize = 40;

/// Validates that a player name is non-empty once trimmed and reasonably
/// short.
///
/// # Examples
///
/// ```ignore
/// validate_player_name("Dad")   // Ok
/// validate_player_name("   ")   // Err - blank
/// ```
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("player_name_required");
        err.message = Some("Player name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > MAX_NAME_CHARS {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!(
                "Player name must be at most {MAX_NAME_CHARS} characters (got {})",
                name.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that an avatar reference is present. Whether the id exists in
/// the catalog is checked against the configuration by the service layer.
pub fn validate_avatar_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("avatar_id_required");
        err.message = Some("Avatar id must not be blank".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_name_valid() {
        assert!(validate_player_name("Dad").is_ok());
        assert!(validate_player_name("  Grandma  ").is_ok());
        assert!(validate_player_name("אדר").is_ok());
    }

    #[test]
    fn test_validate_player_name_blank() {
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err());
        assert!(validate_player_name("\t\n").is_err());
    }

    #[test]
    fn test_validate_player_name_too_long() {
        let long = "x".repeat(41);
        assert!(validate_player_name(&long).is_err());
        let edge = "x".repeat(40);
        assert!(validate_player_name(&edge).is_ok());
    }

    #[test]
    fn test_validate_avatar_id() {
        assert!(validate_avatar_id("1").is_ok());
        assert!(validate_avatar_id("").is_err());
        assert!(validate_avatar_id("  ").is_err());
    }
}
