//! Identity provider port

use async_trait::async_trait;

use super::entity::{Identity, Session, SignUpOutcome, SignUpRequest, VerificationPurpose};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Operations offered by the external identity provider
///
/// Failures are reported as `DomainError::Auth` for credential problems and
/// `DomainError::Network` when the provider could not be reached.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, DomainError>;

    /// Exchange email and password for a session
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, DomainError>;

    /// Redeem a six-digit verification code
    async fn verify_code(
        &self,
        email: &str,
        code: &str,
        purpose: VerificationPurpose,
    ) -> Result<Session, DomainError>;

    /// Send a fresh sign-up verification code
    async fn resend_verification(&self, email: &str) -> Result<(), DomainError>;

    /// Invalidate an access token at the provider
    async fn sign_out(&self, access_token: &str) -> Result<(), DomainError>;

    /// Resolve the identity an access token belongs to
    async fn get_identity(&self, access_token: &str) -> Result<Identity, DomainError>;
}
