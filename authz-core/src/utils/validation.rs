//! Input validation helpers for creation operations.

use validator::ValidateEmail;

use crate::services::error::AuthzError;

/// Invite tokens must fall inside this length band; anything else is a
/// forged or truncated value from a caller bypassing generation.
pub const TOKEN_MIN_LEN: usize = 32;
pub const TOKEN_MAX_LEN: usize = 64;

/// Minimum password length accepted at the two password-setting call sites.
pub const PASSWORD_MIN_LEN: usize = 8;

pub fn validate_email(email: &str) -> Result<(), AuthzError> {
    if email.validate_email() {
        Ok(())
    } else {
        Err(AuthzError::validation(format!("invalid email address: {email}")))
    }
}

pub fn validate_token_shape(token: &str) -> Result<(), AuthzError> {
    if token.len() < TOKEN_MIN_LEN || token.len() > TOKEN_MAX_LEN {
        return Err(AuthzError::validation(format!(
            "token length must be between {TOKEN_MIN_LEN} and {TOKEN_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_password_policy(password: &str) -> Result<(), AuthzError> {
    if password.len() < PASSWORD_MIN_LEN {
        return Err(AuthzError::validation(format!(
            "password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(validate_email("admin@acme.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@acme.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn rejects_out_of_band_tokens() {
        assert!(validate_token_shape(&"x".repeat(31)).is_err());
        assert!(validate_token_shape(&"x".repeat(65)).is_err());
        assert!(validate_token_shape(&"x".repeat(43)).is_ok());
    }

    #[test]
    fn short_passwords_fail_policy() {
        assert!(validate_password_policy("seven77").is_err());
        assert!(validate_password_policy("eight888").is_ok());
    }
}
