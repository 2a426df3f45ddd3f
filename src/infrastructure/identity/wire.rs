//! GoTrue-compatible JSON shapes shared by the HTTP client and the local routes

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::{Identity, IdentityId, ProfileFields, Session, VerificationPurpose};
use crate::domain::{AuthError, DomainError};

/// User object as returned by `/auth/v1/user` and embedded in sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub user_metadata: ProfileFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl WireUser {
    pub fn from_identity(identity: &Identity, confirmed_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: identity.id().as_str().to_string(),
            email: identity.email().to_string(),
            user_metadata: identity.profile().clone(),
            email_confirmed_at: confirmed_at,
        }
    }

    pub fn into_identity(self) -> Identity {
        Identity::new(IdentityId::new(self.id), self.email, self.user_metadata)
    }
}

/// Session object returned by the token and verify endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: i64,
    pub user: WireUser,
}

impl WireSession {
    pub fn from_session(session: &Session, confirmed_at: Option<DateTime<Utc>>) -> Self {
        let expires_at = session.expires_at();
        Self {
            access_token: session.access_token().to_string(),
            token_type: session.token_type().to_string(),
            expires_in: (expires_at - Utc::now()).num_seconds().max(0),
            expires_at: expires_at.timestamp(),
            user: WireUser::from_identity(session.identity(), confirmed_at),
        }
    }

    pub fn into_session(self) -> Session {
        let expires_at = Utc
            .timestamp_opt(self.expires_at, 0)
            .single()
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(self.expires_in));
        Session::new(self.access_token, expires_at, self.user.into_identity())
    }
}

/// Sign-up response: a session when no confirmation is required, a bare user otherwise
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireSignUpResponse {
    Session(WireSession),
    User(WireUser),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpBody {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub data: ProfileFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordGrantBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyBody {
    #[serde(rename = "type")]
    pub purpose: VerificationPurpose,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailBody {
    #[serde(rename = "type", default)]
    pub purpose: VerificationPurpose,
    pub email: String,
}

/// Error body emitted by the provider
///
/// Older deployments answer with `{error, error_description}` instead of
/// `{code, error_code, msg}`, so every field is optional on the way in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl WireError {
    pub fn new(code: u16, error_code: &str, msg: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            error_code: Some(error_code.to_string()),
            msg: Some(msg.into()),
            ..Default::default()
        }
    }

    /// Status code and body for a domain failure
    pub fn from_domain(error: &DomainError) -> Self {
        match error {
            DomainError::Auth(auth) => match auth {
                AuthError::InvalidCredentials => Self::new(400, "invalid_credentials", auth.to_string()),
                AuthError::EmailNotVerified => Self::new(400, "email_not_confirmed", auth.to_string()),
                AuthError::InvalidOrExpiredCode => Self::new(403, "otp_expired", auth.to_string()),
                AuthError::UserAlreadyExists => Self::new(422, "user_already_exists", auth.to_string()),
                AuthError::InvalidEmail => Self::new(400, "validation_failed", auth.to_string()),
                AuthError::WeakPassword { .. } => Self::new(422, "weak_password", auth.to_string()),
                AuthError::InvalidToken | AuthError::NotSignedIn | AuthError::SessionExpired => {
                    Self::new(401, "bad_jwt", auth.to_string())
                }
                AuthError::NotInitialized | AuthError::Provider { .. } => {
                    Self::new(500, "unexpected_failure", "Internal server error")
                }
            },
            DomainError::Validation { .. } => Self::new(400, "validation_failed", error.to_string()),
            _ => Self::new(500, "unexpected_failure", "Internal server error"),
        }
    }

    /// Map a provider error body back onto the domain taxonomy
    pub fn into_domain(self, status: u16) -> DomainError {
        let code = self.error_code.as_deref().or(self.error.as_deref());
        let message = self
            .msg
            .clone()
            .or_else(|| self.error_description.clone())
            .unwrap_or_else(|| format!("Identity provider returned status {}", status));

        let auth = match code {
            Some("invalid_credentials") | Some("invalid_grant") => AuthError::InvalidCredentials,
            Some("email_not_confirmed") => AuthError::EmailNotVerified,
            Some("otp_expired") | Some("otp_disabled") => AuthError::InvalidOrExpiredCode,
            Some("user_already_exists") | Some("email_exists") => AuthError::UserAlreadyExists,
            Some("email_address_invalid") | Some("validation_failed") => AuthError::InvalidEmail,
            Some("weak_password") => AuthError::WeakPassword {
                min_length: crate::domain::identity::MIN_PASSWORD_LENGTH,
            },
            Some("bad_jwt") | Some("session_not_found") | Some("user_not_found") => {
                AuthError::InvalidToken
            }
            _ if status == 401 => AuthError::InvalidToken,
            _ => AuthError::Provider { message },
        };

        auth.into()
    }
}
