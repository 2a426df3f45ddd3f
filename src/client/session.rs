//! Client-side authentication session
//!
//! Holds at most one session, validates it against the identity provider
//! on startup and broadcasts every change of the signed-in identity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::cache::QueryCache;
use crate::domain::identity::{
    validate_verification_code, Identity, IdentityProvider, ProfileFields, Session,
    SignUpOutcome, SignUpRequest, VerificationPurpose,
};
use crate::domain::{AuthError, DomainError};

/// What observers see: who is signed in, and whether that is still being determined
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub identity: Option<Identity>,
    pub is_loading: bool,
}

/// Stream of auth state changes
///
/// Only the latest state is kept per observer, so a slow observer sees the
/// newest value rather than a backlog.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: watch::Receiver<AuthState>,
    primed: bool,
}

impl AuthSubscription {
    /// The current state first, then each change; `None` once the manager is gone
    pub async fn next(&mut self) -> Option<AuthState> {
        if !self.primed {
            self.primed = true;
            return Some(self.receiver.borrow_and_update().clone());
        }

        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn current(&self) -> AuthState {
        self.receiver.borrow().clone()
    }

    /// Detach from the manager
    pub fn unsubscribe(self) {}
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    cache: Arc<QueryCache>,
    session: Mutex<Option<Session>>,
    initialized: AtomicBool,
    state: watch::Sender<AuthState>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("initialized", &self.initialized.load(Ordering::Acquire))
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, cache: Arc<QueryCache>) -> Self {
        let (state, _) = watch::channel(AuthState {
            identity: None,
            is_loading: true,
        });

        Self {
            provider,
            cache,
            session: Mutex::new(None),
            initialized: AtomicBool::new(false),
            state,
        }
    }

    /// Initial load
    ///
    /// A restored session is kept only if the provider still accepts it.
    pub async fn initialize(&self, restored: Option<Session>) -> Option<Identity> {
        let session = match restored {
            Some(session) if session.is_expired() => {
                debug!("Restored session already expired");
                None
            }
            Some(session) => match self.provider.get_identity(session.access_token()).await {
                Ok(identity) => Some(Session::new(
                    session.access_token(),
                    session.expires_at(),
                    identity,
                )),
                Err(err) => {
                    warn!(error = %err, "Discarding restored session");
                    None
                }
            },
            None => None,
        };

        let identity = session.as_ref().map(|s| s.identity().clone());
        *self.lock_session() = session;
        self.initialized.store(true, Ordering::Release);
        self.publish(identity.clone());

        identity
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: ProfileFields,
    ) -> Result<SignUpOutcome, DomainError> {
        self.ensure_initialized()?;

        let request = SignUpRequest::new(email, password).with_profile(profile);
        let outcome = self.provider.sign_up(request).await?;

        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.set_session(session.clone());
        }

        Ok(outcome)
    }

    /// On failure the current session is left as it was
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        self.ensure_initialized()?;

        let session = self.provider.sign_in(email, password).await?;
        self.set_session(session.clone());
        info!(identity_id = %session.identity().id(), "Signed in");

        Ok(session)
    }

    pub async fn verify_code(
        &self,
        email: &str,
        code: &str,
        purpose: VerificationPurpose,
    ) -> Result<Session, DomainError> {
        self.ensure_initialized()?;
        validate_verification_code(code).map_err(AuthError::from)?;

        let session = self.provider.verify_code(email, code, purpose).await?;
        self.set_session(session.clone());

        Ok(session)
    }

    pub async fn resend_verification(&self, email: &str) -> Result<(), DomainError> {
        self.ensure_initialized()?;
        self.provider.resend_verification(email).await
    }

    /// Always ends the local session; provider failures are only logged
    pub async fn sign_out(&self) -> Result<(), DomainError> {
        self.ensure_initialized()?;

        let session = self.lock_session().take();
        if let Some(session) = &session {
            if let Err(err) = self.provider.sign_out(session.access_token()).await {
                warn!(error = %err, "Provider sign-out failed; local session cleared anyway");
            }
        }

        self.discard_session_state();
        info!("Signed out");

        Ok(())
    }

    /// Bearer credential for the current session
    ///
    /// An expired session is dropped here, which observers see as a sign-out.
    pub fn access_token(&self) -> Result<String, DomainError> {
        self.ensure_initialized()?;

        let mut guard = self.lock_session();
        let Some(session) = guard.as_ref() else {
            return Err(AuthError::NotSignedIn.into());
        };

        if !session.is_expired() {
            return Ok(session.access_token().to_string());
        }

        *guard = None;
        drop(guard);

        info!("Session expired");
        self.discard_session_state();

        Err(AuthError::SessionExpired.into())
    }

    /// Drop the session whose token the server rejected
    ///
    /// Does nothing when the current session carries a different token, so a
    /// late rejection cannot end a newer session.
    pub fn expire(&self, rejected_token: &str) {
        let mut guard = self.lock_session();
        if guard
            .as_ref()
            .is_none_or(|session| session.access_token() != rejected_token)
        {
            return;
        }

        *guard = None;
        drop(guard);

        info!("Session rejected by the server");
        self.discard_session_state();
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.lock_session().as_ref().map(|s| s.identity().clone())
    }

    /// The session itself, for callers that persist it across restarts
    pub fn current_session(&self) -> Option<Session> {
        self.lock_session().clone()
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.state.subscribe(),
            primed: false,
        }
    }

    fn ensure_initialized(&self) -> Result<(), DomainError> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(AuthError::NotInitialized.into())
        }
    }

    fn set_session(&self, session: Session) {
        let identity = session.identity().clone();
        let previous = self.lock_session().replace(session);

        // A different user must never see the previous user's cached list
        if previous.is_some_and(|p| p.identity().id() != identity.id()) {
            self.cache.clear();
        }

        self.publish(Some(identity));
    }

    fn discard_session_state(&self) {
        self.cache.clear();
        self.publish(None);
    }

    fn publish(&self, identity: Option<Identity>) {
        let next = AuthState {
            identity,
            is_loading: false,
        };

        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use mockall::predicate::eq;

    use crate::domain::identity::{IdentityId, MockIdentityProvider};
    use crate::domain::task::Task;

    fn alice() -> Identity {
        Identity::new(IdentityId::new("user-a"), "alice@x.com", ProfileFields::default())
    }

    fn session_for(identity: Identity, valid_for: Duration) -> Session {
        Session::new("token-a", Utc::now() + valid_for, identity)
    }

    async fn manager(provider: MockIdentityProvider) -> (SessionManager, Arc<QueryCache>) {
        let cache = Arc::new(QueryCache::new());
        let manager = SessionManager::new(Arc::new(provider), cache.clone());
        manager.initialize(None).await;
        (manager, cache)
    }

    fn auth_error<T: std::fmt::Debug>(result: Result<T, DomainError>) -> AuthError {
        match result {
            Err(DomainError::Auth(err)) => err,
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_operations_require_initialize() {
        let cache = Arc::new(QueryCache::new());
        let manager = SessionManager::new(Arc::new(MockIdentityProvider::new()), cache);

        assert_eq!(
            auth_error(manager.sign_in("alice@x.com", "secret1").await),
            AuthError::NotInitialized
        );
        assert_eq!(auth_error(manager.access_token()), AuthError::NotInitialized);
        assert_eq!(auth_error(manager.sign_out().await), AuthError::NotInitialized);
    }

    #[tokio::test]
    async fn test_initial_state_is_loading() {
        let cache = Arc::new(QueryCache::new());
        let manager = SessionManager::new(Arc::new(MockIdentityProvider::new()), cache);
        let mut subscription = manager.subscribe();

        let first = subscription.next().await.unwrap();
        assert!(first.is_loading);
        assert!(first.identity.is_none());

        manager.initialize(None).await;
        let second = subscription.next().await.unwrap();
        assert!(!second.is_loading);
        assert!(second.identity.is_none());
    }

    #[tokio::test]
    async fn test_initialize_keeps_valid_restored_session() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_identity()
            .with(eq("token-a"))
            .returning(|_| Ok(alice()));

        let manager = SessionManager::new(Arc::new(provider), Arc::new(QueryCache::new()));
        let identity = manager
            .initialize(Some(session_for(alice(), Duration::hours(1))))
            .await;

        assert_eq!(identity, Some(alice()));
        assert_eq!(manager.access_token().unwrap(), "token-a");
    }

    #[tokio::test]
    async fn test_initialize_drops_rejected_session() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_identity()
            .returning(|_| Err(AuthError::InvalidToken.into()));

        let manager = SessionManager::new(Arc::new(provider), Arc::new(QueryCache::new()));
        let identity = manager
            .initialize(Some(session_for(alice(), Duration::hours(1))))
            .await;

        assert!(identity.is_none());
        assert_eq!(auth_error(manager.access_token()), AuthError::NotSignedIn);
    }

    #[tokio::test]
    async fn test_sign_in_publishes_identity() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_sign_in()
            .with(eq("alice@x.com"), eq("secret1"))
            .returning(|_, _| Ok(session_for(alice(), Duration::hours(1))));

        let (manager, _) = manager(provider).await;
        let mut subscription = manager.subscribe();
        assert!(subscription.next().await.unwrap().identity.is_none());

        manager.sign_in("alice@x.com", "secret1").await.unwrap();

        let state = subscription.next().await.unwrap();
        assert_eq!(state.identity, Some(alice()));
        assert_eq!(manager.current_identity(), Some(alice()));
    }

    #[tokio::test]
    async fn test_failed_sign_in_leaves_session_empty() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_sign_in()
            .returning(|_, _| Err(AuthError::InvalidCredentials.into()));

        let (manager, _) = manager(provider).await;

        assert_eq!(
            auth_error(manager.sign_in("alice@x.com", "nope").await),
            AuthError::InvalidCredentials
        );
        assert!(manager.current_session().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_pending_does_not_sign_in() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_sign_up()
            .returning(|_| Ok(SignUpOutcome::PendingVerification { identity: alice() }));

        let (manager, _) = manager(provider).await;
        let outcome = manager
            .sign_up("alice@x.com", "secret1", ProfileFields::default())
            .await
            .unwrap();

        assert!(outcome.needs_verification());
        assert!(manager.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_malformed_code_rejected_locally() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_verify_code().never();

        let (manager, _) = manager(provider).await;

        assert_eq!(
            auth_error(
                manager
                    .verify_code("alice@x.com", "12ab56", VerificationPurpose::Signup)
                    .await
            ),
            AuthError::InvalidOrExpiredCode
        );
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_when_provider_fails() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_sign_in()
            .returning(|_, _| Ok(session_for(alice(), Duration::hours(1))));
        provider
            .expect_sign_out()
            .returning(|_| Err(DomainError::network("offline")));

        let (manager, cache) = manager(provider).await;
        manager.sign_in("alice@x.com", "secret1").await.unwrap();
        cache
            .insert(alice().id(), vec![Task::new(alice().id().clone(), "cached")])
            .await;

        manager.sign_out().await.unwrap();

        assert!(manager.current_identity().is_none());
        assert!(cache.get(alice().id()).await.is_none());
        assert_eq!(manager.subscribe().current().identity, None);
    }

    #[tokio::test]
    async fn test_expired_session_is_cleared_on_access() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_sign_in()
            .returning(|_, _| Ok(session_for(alice(), Duration::seconds(-5))));

        let (manager, cache) = manager(provider).await;
        manager.sign_in("alice@x.com", "secret1").await.unwrap();
        cache.insert(alice().id(), Vec::new()).await;

        let mut subscription = manager.subscribe();
        assert!(subscription.next().await.unwrap().identity.is_some());

        assert_eq!(auth_error(manager.access_token()), AuthError::SessionExpired);
        assert!(subscription.next().await.unwrap().identity.is_none());
        assert!(cache.get(alice().id()).await.is_none());
        assert_eq!(auth_error(manager.access_token()), AuthError::NotSignedIn);
    }

    #[tokio::test]
    async fn test_server_rejection_ends_matching_session_only() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_sign_in()
            .returning(|_, _| Ok(session_for(alice(), Duration::hours(1))));

        let (manager, cache) = manager(provider).await;
        manager.sign_in("alice@x.com", "secret1").await.unwrap();
        cache.insert(alice().id(), Vec::new()).await;

        let mut subscription = manager.subscribe();
        assert!(subscription.next().await.unwrap().identity.is_some());

        manager.expire("some-older-token");
        assert!(manager.current_identity().is_some());

        manager.expire("token-a");
        assert!(subscription.next().await.unwrap().identity.is_none());
        assert!(cache.get(alice().id()).await.is_none());
        assert_eq!(auth_error(manager.access_token()), AuthError::NotSignedIn);
    }

    #[tokio::test]
    async fn test_subscription_sees_latest_state_only() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_sign_in()
            .returning(|_, _| Ok(session_for(alice(), Duration::hours(1))));
        provider.expect_sign_out().returning(|_| Ok(()));

        let (manager, _) = manager(provider).await;
        let mut subscription = manager.subscribe();
        subscription.next().await.unwrap();

        manager.sign_in("alice@x.com", "secret1").await.unwrap();
        manager.sign_out().await.unwrap();

        // Both changes happened before the observer looked; it sees only the last
        let state = subscription.next().await.unwrap();
        assert!(state.identity.is_none());
        subscription.unsubscribe();
    }
}
