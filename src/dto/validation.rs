//! Validation helpers for join inputs.

use validator::ValidationError;

const SESSION_CODE_MIN: usize = 4;
const SESSION_CODE_MAX: usize = 8;
const DISPLAY_NAME_MAX: usize = 40;

/// Validates that a session code is 4 to 8 uppercase ASCII alphanumerics.
///
/// Callers normalise user input to uppercase first (see [`super::participant::JoinRequest::new`]).
pub fn validate_session_code(code: &str) -> Result<(), ValidationError> {
    if !(SESSION_CODE_MIN..=SESSION_CODE_MAX).contains(&code.len()) {
        let mut err = ValidationError::new("session_code_length");
        err.message = Some(
            format!(
                "Session code must be {SESSION_CODE_MIN} to {SESSION_CODE_MAX} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    {
        let mut err = ValidationError::new("session_code_format");
        err.message = Some("Session code must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a participant display name: non-blank, at most 40 characters.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("display_name_empty");
        err.message = Some("Display name must not be empty".into());
        return Err(err);
    }

    if name.chars().count() > DISPLAY_NAME_MAX {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(format!("Display name must be at most {DISPLAY_NAME_MAX} characters").into());
        return Err(err);
    }

    Ok(())
}
