//! In-process identity provider
//!
//! Stores accounts in memory with Argon2 password hashes and issues HS256
//! access tokens. Verification codes are logged instead of mailed, which is
//! enough for local development and the end-to-end tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::code::{CodeGenerator, RandomCodeGenerator};
use super::jwt::JwtService;
use super::password::{Argon2Hasher, PasswordHasher};
use crate::domain::identity::{
    normalize_email, validate_email, validate_password, validate_verification_code, Identity,
    IdentityId, IdentityProvider, IdentityValidationError, Session, SignUpOutcome, SignUpRequest,
    VerificationPurpose,
};
use crate::domain::{AuthError, DomainError};

/// Wrong guesses tolerated before a pending code is discarded
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// Behavioural switches for the local provider
#[derive(Debug, Clone)]
pub struct LocalProviderConfig {
    /// Require a verification code before the first sign-in
    pub require_email_verification: bool,
    /// How long an issued code stays redeemable
    pub code_ttl: Duration,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            require_email_verification: true,
            code_ttl: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    purpose: VerificationPurpose,
    expires_at: DateTime<Utc>,
    failed_attempts: u32,
}

impl PendingCode {
    fn matches(&self, code: &str, purpose: VerificationPurpose) -> bool {
        self.purpose == purpose && self.code == code && Utc::now() < self.expires_at
    }
}

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password_hash: String,
    confirmed_at: Option<DateTime<Utc>>,
    pending_code: Option<PendingCode>,
}

/// Identity provider backed by process memory
#[derive(Debug)]
pub struct LocalIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    /// Revoked token ids with the expiry of the token they belong to
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
    hasher: Arc<dyn PasswordHasher>,
    codes: Arc<dyn CodeGenerator>,
    tokens: JwtService,
    config: LocalProviderConfig,
}

fn rejected(err: IdentityValidationError) -> DomainError {
    AuthError::from(err).into()
}

impl LocalIdentityProvider {
    pub fn new(tokens: JwtService, config: LocalProviderConfig) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            revoked: RwLock::new(HashMap::new()),
            hasher: Arc::new(Argon2Hasher::new()),
            codes: Arc::new(RandomCodeGenerator),
            tokens,
            config,
        }
    }

    /// Replace the verification code source
    pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    /// When the account was confirmed, if it exists and is confirmed
    pub async fn confirmed_at(&self, email: &str) -> Option<DateTime<Utc>> {
        let accounts = self.accounts.read().await;
        accounts
            .get(&normalize_email(email))
            .and_then(|account| account.confirmed_at)
    }

    /// Issue a fresh code for the given purpose
    ///
    /// Unknown addresses are accepted silently so callers cannot probe for
    /// registered accounts.
    pub async fn request_code(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<(), DomainError> {
        validate_email(email).map_err(rejected)?;
        let key = normalize_email(email);

        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(&key) else {
            debug!(email = %key, purpose = purpose.as_str(), "Code requested for unknown account");
            return Ok(());
        };

        if purpose == VerificationPurpose::Signup && account.confirmed_at.is_some() {
            debug!(email = %key, "Account already confirmed, no code issued");
            return Ok(());
        }

        account.pending_code = Some(self.issue_code(&key, purpose));
        Ok(())
    }

    fn issue_code(&self, email: &str, purpose: VerificationPurpose) -> PendingCode {
        let code = self.codes.generate();
        info!(
            email = %email,
            purpose = purpose.as_str(),
            code = %code,
            "Verification code issued"
        );

        PendingCode {
            code,
            purpose,
            expires_at: Utc::now() + self.config.code_ttl,
            failed_attempts: 0,
        }
    }

    fn start_session(&self, identity: &Identity) -> Result<Session, DomainError> {
        let (token, claims) = self.tokens.generate(identity)?;
        Ok(Session::new(token, claims.expires_at(), identity.clone()))
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, DomainError> {
        validate_email(&request.email).map_err(rejected)?;
        validate_password(&request.password).map_err(rejected)?;

        let key = normalize_email(&request.email);
        let mut accounts = self.accounts.write().await;

        if accounts.contains_key(&key) {
            return Err(AuthError::UserAlreadyExists.into());
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let identity = Identity::new(
            IdentityId::new(Uuid::new_v4().to_string()),
            key.clone(),
            request.profile,
        );

        let mut account = Account {
            identity: identity.clone(),
            password_hash,
            confirmed_at: None,
            pending_code: None,
        };

        let outcome = if self.config.require_email_verification {
            account.pending_code = Some(self.issue_code(&key, VerificationPurpose::Signup));
            SignUpOutcome::PendingVerification { identity }
        } else {
            account.confirmed_at = Some(Utc::now());
            SignUpOutcome::SignedIn(self.start_session(&identity)?)
        };

        accounts.insert(key, account);
        info!(identity_id = %outcome.identity().id(), "Account registered");

        Ok(outcome)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        let key = normalize_email(email);
        let accounts = self.accounts.read().await;

        let account = accounts
            .get(&key)
            .filter(|account| self.hasher.verify(password, &account.password_hash))
            .ok_or(AuthError::InvalidCredentials)?;

        if account.confirmed_at.is_none() {
            return Err(AuthError::EmailNotVerified.into());
        }

        self.start_session(&account.identity)
    }

    async fn verify_code(
        &self,
        email: &str,
        code: &str,
        purpose: VerificationPurpose,
    ) -> Result<Session, DomainError> {
        validate_verification_code(code).map_err(rejected)?;

        let key = normalize_email(email);
        let mut accounts = self.accounts.write().await;

        let account = accounts
            .get_mut(&key)
            .ok_or(AuthError::InvalidOrExpiredCode)?;
        let pending = account
            .pending_code
            .as_mut()
            .ok_or(AuthError::InvalidOrExpiredCode)?;

        if !pending.matches(code, purpose) {
            pending.failed_attempts += 1;
            if pending.failed_attempts >= MAX_CODE_ATTEMPTS {
                warn!(email = %key, "Too many wrong codes, pending code discarded");
                account.pending_code = None;
            }
            return Err(AuthError::InvalidOrExpiredCode.into());
        }

        account.pending_code = None;
        if account.confirmed_at.is_none() {
            account.confirmed_at = Some(Utc::now());
        }

        self.start_session(&account.identity)
    }

    async fn resend_verification(&self, email: &str) -> Result<(), DomainError> {
        self.request_code(email, VerificationPurpose::Signup).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), DomainError> {
        let claims = self.tokens.validate(access_token)?;
        let now = Utc::now();

        let mut revoked = self.revoked.write().await;
        // Expired tokens fail validation on their own
        revoked.retain(|_, expires_at| *expires_at > now);
        revoked.insert(claims.jti.clone(), claims.expires_at());
        drop(revoked);

        debug!(identity_id = %claims.sub, "Access token revoked");
        Ok(())
    }

    async fn get_identity(&self, access_token: &str) -> Result<Identity, DomainError> {
        let claims = self.tokens.validate(access_token)?;

        if self.revoked.read().await.contains_key(&claims.jti) {
            return Err(AuthError::InvalidToken.into());
        }

        let accounts = self.accounts.read().await;
        match accounts.get(&normalize_email(&claims.email)) {
            Some(account) if account.identity.id().as_str() == claims.sub => {
                Ok(account.identity.clone())
            }
            _ => {
                warn!(identity_id = %claims.sub, "Token refers to an unknown account");
                Err(AuthError::InvalidToken.into())
            }
        }
    }
}
