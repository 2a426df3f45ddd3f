//! Credential validation utilities

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::domain::error::AuthError;

/// Errors that can occur while validating sign-up or verification input
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IdentityValidationError {
    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Email '{0}' is not a valid address")]
    MalformedEmail(String),

    #[error("Password is too short. Minimum length is {0} characters")]
    PasswordTooShort(usize),

    #[error("Password exceeds maximum length of {0} characters")]
    PasswordTooLong(usize),

    #[error("Verification code must be exactly {0} digits")]
    MalformedCode(usize),
}

pub const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 72;
pub const VERIFICATION_CODE_LENGTH: usize = 6;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Validate an email address
///
/// Only the shape is checked; deliverability is the provider's concern.
pub fn validate_email(email: &str) -> Result<(), IdentityValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(IdentityValidationError::EmptyEmail);
    }

    if !EMAIL_PATTERN.is_match(email) {
        return Err(IdentityValidationError::MalformedEmail(email.to_string()));
    }

    Ok(())
}

/// Validate a password
///
/// Rules:
/// - Minimum 6 characters
/// - Maximum 72 characters
pub fn validate_password(password: &str) -> Result<(), IdentityValidationError> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(IdentityValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(IdentityValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

/// Validate a six-digit verification code
pub fn validate_verification_code(code: &str) -> Result<(), IdentityValidationError> {
    let is_valid = code.len() == VERIFICATION_CODE_LENGTH && code.chars().all(|c| c.is_ascii_digit());

    if !is_valid {
        return Err(IdentityValidationError::MalformedCode(VERIFICATION_CODE_LENGTH));
    }

    Ok(())
}

/// Canonical form used as the account key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl From<IdentityValidationError> for AuthError {
    fn from(err: IdentityValidationError) -> Self {
        match err {
            IdentityValidationError::EmptyEmail | IdentityValidationError::MalformedEmail(_) => {
                AuthError::InvalidEmail
            }
            IdentityValidationError::PasswordTooShort(min_length) => {
                AuthError::WeakPassword { min_length }
            }
            IdentityValidationError::PasswordTooLong(_) => AuthError::WeakPassword {
                min_length: MIN_PASSWORD_LENGTH,
            },
            IdentityValidationError::MalformedCode(_) => AuthError::InvalidOrExpiredCode,
        }
    }
}
