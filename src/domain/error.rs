use thiserror::Error;

/// Authentication failures reported by the identity provider or the session layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    EmailNotVerified,

    #[error("Verification code is invalid or has expired")]
    InvalidOrExpiredCode,

    #[error("Authentication client is not initialized")]
    NotInitialized,

    #[error("Email address is malformed")]
    InvalidEmail,

    #[error("Password should be at least {min_length} characters")]
    WeakPassword { min_length: usize },

    #[error("User already registered")]
    UserAlreadyExists,

    #[error("Invalid or expired access token")]
    InvalidToken,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Session has expired")]
    SessionExpired,

    #[error("Identity provider error: {message}")]
    Provider { message: String },
}

/// Core domain errors
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {field}: {constraint}")]
    Validation { field: String, constraint: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Auth(AuthError::Provider {
            message: message.into(),
        })
    }

    /// The authentication failure carried by this error, if any
    pub fn auth_error(&self) -> Option<&AuthError> {
        match self {
            Self::Auth(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
