//! GoTrue-compatible authentication endpoints
//!
//! Mounted under `/auth/v1` only when this process runs the in-process
//! identity provider, so that remote clients can use the same HTTP client
//! they would use against a hosted provider.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::api::middleware::extract_bearer_token;
use crate::api::state::AppState;
use crate::domain::identity::{
    Identity, IdentityProvider, Session, SignUpOutcome, SignUpRequest, VerificationPurpose,
};
use crate::domain::{AuthError, DomainError};
use crate::infrastructure::identity::wire::{
    EmailBody, PasswordGrantBody, SignUpBody, VerifyBody, WireError, WireSession,
    WireSignUpResponse, WireUser,
};
use crate::infrastructure::identity::LocalIdentityProvider;

pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/token", post(token))
        .route("/verify", post(verify))
        .route("/resend", post(resend))
        .route("/recover", post(recover))
        .route("/otp", post(otp))
        .route("/logout", post(logout))
        .route("/user", get(current_user))
}

/// Error in the provider's own wire format
#[derive(Debug)]
pub struct AuthRouteError(WireError);

impl From<DomainError> for AuthRouteError {
    fn from(err: DomainError) -> Self {
        if err.auth_error().is_none() && !matches!(err, DomainError::Validation { .. }) {
            tracing::error!(error = %err, "Auth endpoint failed");
        }
        Self(WireError::from_domain(&err))
    }
}

impl From<JsonRejection> for AuthRouteError {
    fn from(rejection: JsonRejection) -> Self {
        Self(WireError::new(400, "validation_failed", rejection.body_text()))
    }
}

impl IntoResponse for AuthRouteError {
    fn into_response(self) -> Response {
        let status = self
            .0
            .code
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

type AuthResult<T> = Result<T, AuthRouteError>;

fn local(state: &AppState) -> AuthResult<Arc<LocalIdentityProvider>> {
    state
        .local_provider
        .clone()
        .ok_or_else(|| DomainError::from(AuthError::NotInitialized).into())
}

fn bearer(headers: &HeaderMap) -> AuthResult<String> {
    extract_bearer_token(headers)
        .map_err(|_| AuthRouteError(WireError::new(401, "bad_jwt", "Missing or malformed bearer token")))
}

async fn user_for(provider: &LocalIdentityProvider, identity: &Identity) -> WireUser {
    let confirmed_at = provider.confirmed_at(identity.email()).await;
    WireUser::from_identity(identity, confirmed_at)
}

async fn session_for(provider: &LocalIdentityProvider, session: &Session) -> WireSession {
    let confirmed_at = provider.confirmed_at(session.identity().email()).await;
    WireSession::from_session(session, confirmed_at)
}

/// POST /auth/v1/signup
pub async fn sign_up(
    State(state): State<AppState>,
    body: Result<Json<SignUpBody>, JsonRejection>,
) -> AuthResult<Json<WireSignUpResponse>> {
    let provider = local(&state)?;
    let Json(body) = body?;

    let request = SignUpRequest::new(body.email, body.password).with_profile(body.data);
    let response = match provider.sign_up(request).await? {
        SignUpOutcome::SignedIn(session) => {
            WireSignUpResponse::Session(session_for(&provider, &session).await)
        }
        SignUpOutcome::PendingVerification { identity } => {
            WireSignUpResponse::User(user_for(&provider, &identity).await)
        }
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub grant_type: String,
}

/// POST /auth/v1/token?grant_type=password
pub async fn token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    body: Result<Json<PasswordGrantBody>, JsonRejection>,
) -> AuthResult<Json<WireSession>> {
    let provider = local(&state)?;

    if query.grant_type != "password" {
        return Err(AuthRouteError(WireError::new(
            400,
            "validation_failed",
            format!("Unsupported grant type: {}", query.grant_type),
        )));
    }

    let Json(body) = body?;
    let session = provider.sign_in(&body.email, &body.password).await?;
    info!(identity_id = %session.identity().id(), "Password sign-in");

    Ok(Json(session_for(&provider, &session).await))
}

/// POST /auth/v1/verify
pub async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyBody>, JsonRejection>,
) -> AuthResult<Json<WireSession>> {
    let provider = local(&state)?;
    let Json(body) = body?;

    let session = provider
        .verify_code(&body.email, &body.token, body.purpose)
        .await?;

    Ok(Json(session_for(&provider, &session).await))
}

/// POST /auth/v1/resend
pub async fn resend(
    State(state): State<AppState>,
    body: Result<Json<EmailBody>, JsonRejection>,
) -> AuthResult<Json<serde_json::Value>> {
    let provider = local(&state)?;
    let Json(body) = body?;

    provider.request_code(&body.email, body.purpose).await?;
    Ok(Json(serde_json::json!({})))
}

/// POST /auth/v1/recover
pub async fn recover(
    State(state): State<AppState>,
    body: Result<Json<EmailBody>, JsonRejection>,
) -> AuthResult<Json<serde_json::Value>> {
    let provider = local(&state)?;
    let Json(body) = body?;

    provider
        .request_code(&body.email, VerificationPurpose::Recovery)
        .await?;
    Ok(Json(serde_json::json!({})))
}

/// POST /auth/v1/otp
pub async fn otp(
    State(state): State<AppState>,
    body: Result<Json<EmailBody>, JsonRejection>,
) -> AuthResult<Json<serde_json::Value>> {
    let provider = local(&state)?;
    let Json(body) = body?;

    provider
        .request_code(&body.email, VerificationPurpose::MagicLink)
        .await?;
    Ok(Json(serde_json::json!({})))
}

/// POST /auth/v1/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AuthResult<StatusCode> {
    let provider = local(&state)?;
    let token = bearer(&headers)?;

    provider.sign_out(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/v1/user
pub async fn current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AuthResult<Json<WireUser>> {
    let provider = local(&state)?;
    let token = bearer(&headers)?;

    let identity = provider.get_identity(&token).await?;
    Ok(Json(user_for(&provider, &identity).await))
}
