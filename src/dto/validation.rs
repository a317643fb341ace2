//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::{InvalidMatchId, MatchId};

/// Validates that a match id has the shape minted by keepers.
///
/// # Examples
///
/// ```ignore
/// validate_match_id("lx3k9a2bq7f0zz") // Ok
/// validate_match_id("abc")            // Err - too short
/// validate_match_id("abc-123")        // Err - charset
/// ```
pub fn validate_match_id(id: &str) -> Result<(), ValidationError> {
    match MatchId::parse(id) {
        Ok(_) => Ok(()),
        Err(err @ InvalidMatchId::Length(_)) => {
            let mut error = ValidationError::new("match_id_length");
            error.message = Some(err.to_string().into());
            Err(error)
        }
        Err(err @ InvalidMatchId::Charset) => {
            let mut error = ValidationError::new("match_id_format");
            error.message = Some(err.to_string().into());
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_match_id_valid() {
        assert!(validate_match_id("abc123").is_ok());
        assert!(validate_match_id("lx3k9a2bq7f0zz").is_ok());
    }

    #[test]
    fn test_validate_match_id_invalid_length() {
        assert_eq!(
            validate_match_id("abc").unwrap_err().code,
            "match_id_length"
        );
        assert!(validate_match_id("").is_err());
    }

    #[test]
    fn test_validate_match_id_invalid_format() {
        assert_eq!(
            validate_match_id("abc-123").unwrap_err().code,
            "match_id_format"
        );
        assert!(validate_match_id("abc 123").is_err());
    }
}
