//! Identity domain
//!
//! Types for the authenticated principal, its session credential and the
//! port through which the external identity provider is reached.

mod entity;
mod provider;
mod validation;

pub use entity::{
    Identity, IdentityId, ProfileFields, Session, SignUpOutcome, SignUpRequest,
    VerificationPurpose,
};
pub use provider::IdentityProvider;
pub use validation::{
    normalize_email, validate_email, validate_password, validate_verification_code,
    IdentityValidationError, MIN_PASSWORD_LENGTH, VERIFICATION_CODE_LENGTH,
};

#[cfg(test)]
pub use provider::MockIdentityProvider;
