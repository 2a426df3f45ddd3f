//! REST client for a GoTrue-compatible identity provider

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::wire::{
    EmailBody, PasswordGrantBody, SignUpBody, VerifyBody, WireError, WireSession,
    WireSignUpResponse, WireUser,
};
use crate::domain::identity::{
    Identity, IdentityProvider, Session, SignUpOutcome, SignUpRequest, VerificationPurpose,
};
use crate::domain::DomainError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity provider reached over HTTP
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for HttpIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIdentityProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"[hidden]")
            .finish()
    }
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, DomainError> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header("apikey", &self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DomainError> {
        let response = request
            .send()
            .await
            .map_err(|e| DomainError::network(format!("Identity provider unreachable: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error: WireError = serde_json::from_str(&body).unwrap_or_else(|_| WireError {
            msg: Some(format!("HTTP {}: {}", status, body)),
            ..Default::default()
        });

        if status.is_server_error() {
            warn!(status = status.as_u16(), "Identity provider returned a server error");
        }

        Err(error.into_domain(status.as_u16()))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DomainError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DomainError::provider(format!("Malformed provider response: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, DomainError> {
        let body = SignUpBody {
            email: request.email,
            password: request.password,
            data: request.profile,
        };

        let response: WireSignUpResponse = self.send_json(self.post("/signup").json(&body)).await?;

        Ok(match response {
            WireSignUpResponse::Session(session) => SignUpOutcome::SignedIn(session.into_session()),
            WireSignUpResponse::User(user) => SignUpOutcome::PendingVerification {
                identity: user.into_identity(),
            },
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        let body = PasswordGrantBody {
            email: email.to_string(),
            password: password.to_string(),
        };

        let request = self
            .post("/token")
            .query(&[("grant_type", "password")])
            .json(&body);

        let session: WireSession = self.send_json(request).await?;
        Ok(session.into_session())
    }

    async fn verify_code(
        &self,
        email: &str,
        code: &str,
        purpose: VerificationPurpose,
    ) -> Result<Session, DomainError> {
        let body = VerifyBody {
            purpose,
            email: email.to_string(),
            token: code.to_string(),
        };

        let session: WireSession = self.send_json(self.post("/verify").json(&body)).await?;
        Ok(session.into_session())
    }

    async fn resend_verification(&self, email: &str) -> Result<(), DomainError> {
        let body = EmailBody {
            purpose: VerificationPurpose::Signup,
            email: email.to_string(),
        };

        self.send(self.post("/resend").json(&body)).await?;
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), DomainError> {
        let response = self.send(self.post("/logout").bearer_auth(access_token)).await?;
        debug!(status = response.status().as_u16(), "Provider sign-out acknowledged");
        Ok(())
    }

    async fn get_identity(&self, access_token: &str) -> Result<Identity, DomainError> {
        let request = self
            .client
            .get(self.url("/user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token);

        let user: WireUser = self.send_json(request).await?;
        Ok(user.into_identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuthError;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_json() -> serde_json::Value {
        json!({
            "access_token": "token-abc",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 4_000_000_000_i64,
            "user": {"id": "user-a", "email": "alice@x.com"}
        })
    }

    async fn provider(server: &MockServer) -> HttpIdentityProvider {
        HttpIdentityProvider::new(server.uri(), "anon-key").unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_sends_password_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({"email": "alice@x.com", "password": "secret1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
            .expect(1)
            .mount(&server)
            .await;

        let session = provider(&server)
            .await
            .sign_in("alice@x.com", "secret1")
            .await
            .unwrap();

        assert_eq!(session.access_token(), "token-abc");
        assert_eq!(session.identity().id().as_str(), "user-a");
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn test_sign_in_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 400,
                "error_code": "invalid_credentials",
                "msg": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let result = provider(&server).await.sign_in("alice@x.com", "nope").await;
        assert!(matches!(
            result,
            Err(DomainError::Auth(AuthError::InvalidCredentials))
        ));
    }

    #[tokio::test]
    async fn test_sign_up_pending_verification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-a",
                "email": "alice@x.com",
                "user_metadata": {"first_name": "Alice"}
            })))
            .mount(&server)
            .await;

        let outcome = provider(&server)
            .await
            .sign_up(SignUpRequest::new("alice@x.com", "secret1"))
            .await
            .unwrap();

        assert!(outcome.needs_verification());
        assert_eq!(outcome.identity().first_name(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_verify_sends_type_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/verify"))
            .and(body_json(json!({
                "type": "signup",
                "email": "alice@x.com",
                "token": "123456"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
            .expect(1)
            .mount(&server)
            .await;

        let session = provider(&server)
            .await
            .verify_code("alice@x.com", "123456", VerificationPurpose::Signup)
            .await
            .unwrap();
        assert_eq!(session.identity().email(), "alice@x.com");
    }

    #[tokio::test]
    async fn test_verify_expired_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/verify"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": 403,
                "error_code": "otp_expired",
                "msg": "Token has expired or is invalid"
            })))
            .mount(&server)
            .await;

        let result = provider(&server)
            .await
            .verify_code("alice@x.com", "000000", VerificationPurpose::Signup)
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Auth(AuthError::InvalidOrExpiredCode))
        ));
    }

    #[tokio::test]
    async fn test_get_identity_uses_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer token-abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "user-a", "email": "alice@x.com"})),
            )
            .mount(&server)
            .await;

        let identity = provider(&server).await.get_identity("token-abc").await.unwrap();
        assert_eq!(identity.id().as_str(), "user-a");
    }

    #[tokio::test]
    async fn test_get_identity_unauthorized_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = provider(&server).await.get_identity("stale").await;
        assert!(matches!(result, Err(DomainError::Auth(AuthError::InvalidToken))));
    }

    #[tokio::test]
    async fn test_resend_and_sign_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/resend"))
            .and(body_json(json!({"type": "signup", "email": "alice@x.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer token-abc"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server).await;
        provider.resend_verification("alice@x.com").await.unwrap();
        provider.sign_out("token-abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        let provider = HttpIdentityProvider::with_timeout(
            "http://127.0.0.1:9",
            "anon-key",
            Duration::from_millis(500),
        )
        .unwrap();

        let result = provider.sign_in("alice@x.com", "secret1").await;
        assert!(matches!(result, Err(DomainError::Network { .. })));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let provider = HttpIdentityProvider::new("http://localhost", "anon-key").unwrap();
        assert!(!format!("{:?}", provider).contains("anon-key"));
    }
}
