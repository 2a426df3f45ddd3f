//! Identity, session and sign-up types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional profile data captured at sign-up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// The authenticated principal owning tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    id: IdentityId,
    email: String,
    #[serde(default)]
    profile: ProfileFields,
}

impl Identity {
    pub fn new(id: IdentityId, email: impl Into<String>, profile: ProfileFields) -> Self {
        Self {
            id,
            email: email.into(),
            profile,
        }
    }

    pub fn id(&self) -> &IdentityId {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn profile(&self) -> &ProfileFields {
        &self.profile
    }

    /// First name for greetings, if the user supplied one
    pub fn first_name(&self) -> Option<&str> {
        self.profile
            .first_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

/// A bearer credential bound to an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    access_token: String,
    token_type: String,
    expires_at: DateTime<Utc>,
    identity: Identity,
}

impl Session {
    pub fn new(
        access_token: impl Into<String>,
        expires_at: DateTime<Utc>,
        identity: Identity,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "bearer".to_string(),
            expires_at,
            identity,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// What a verification code is being redeemed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPurpose {
    #[default]
    Signup,
    EmailChange,
    Recovery,
    #[serde(rename = "magiclink")]
    MagicLink,
}

impl VerificationPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::EmailChange => "email_change",
            Self::Recovery => "recovery",
            Self::MagicLink => "magiclink",
        }
    }
}

/// Sign-up input
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub profile: ProfileFields,
}

impl SignUpRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            profile: ProfileFields::default(),
        }
    }

    pub fn with_profile(mut self, profile: ProfileFields) -> Self {
        self.profile = profile;
        self
    }
}

/// Result of a successful sign-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The provider issued a session immediately
    SignedIn(Session),
    /// The account exists but must be confirmed with a verification code
    PendingVerification { identity: Identity },
}

impl SignUpOutcome {
    pub fn identity(&self) -> &Identity {
        match self {
            Self::SignedIn(session) => session.identity(),
            Self::PendingVerification { identity } => identity,
        }
    }

    pub fn needs_verification(&self) -> bool {
        matches!(self, Self::PendingVerification { .. })
    }
}
