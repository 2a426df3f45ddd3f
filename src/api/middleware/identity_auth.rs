//! Bearer-token authentication against the identity provider

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::identity::Identity;
use crate::domain::DomainError;

/// Extractor that resolves `Authorization: Bearer <token>` to an identity
///
/// Missing, malformed, expired and revoked credentials all reject with 401.
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub Identity);

impl FromRequestParts<AppState> for RequireIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;

        let identity = state
            .identity_provider
            .get_identity(&token)
            .await
            .map_err(|err| match err {
                DomainError::Auth(_) => {
                    debug!(error = %err, "Bearer token rejected");
                    ApiError::unauthorized("Invalid or expired access token")
                }
                other => ApiError::from(other),
            })?;

        Ok(RequireIdentity(identity))
    }
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let missing = || {
        ApiError::unauthorized(
            "Authentication required. Provide a token via 'Authorization: Bearer <token>' header",
        )
    };

    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(missing)?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header encoding"))?;

    let (scheme, token) = value.split_once(' ').ok_or_else(missing)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(missing());
    }

    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        let token = extract_bearer_token(&headers("Bearer eyJhbGciOiJIUzI1NiJ9.test")).unwrap();
        assert_eq!(token, "eyJhbGciOiJIUzI1NiJ9.test");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(extract_bearer_token(&headers("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_missing_token() {
        let err = extract_bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_malformed_headers() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer    ", "token-only"] {
            let err = extract_bearer_token(&headers(value)).unwrap_err();
            assert_eq!(err.status, StatusCode::UNAUTHORIZED, "{}", value);
        }
    }

    #[test]
    fn test_trimmed_token() {
        let token = extract_bearer_token(&headers("Bearer   token-with-spaces   ")).unwrap();
        assert_eq!(token, "token-with-spaces");
    }
}
