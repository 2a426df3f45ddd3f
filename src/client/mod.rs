//! Client-side components
//!
//! The session manager owns the authentication state, the view-model owns
//! the task list presentation state, and both share one query cache.

pub mod cache;
pub mod gateway;
pub mod session;
pub mod view_model;

pub use cache::{QueryCache, QueryCacheConfig};
pub use gateway::{HttpTaskApi, TaskApi};
pub use session::{AuthState, AuthSubscription, SessionManager};
pub use view_model::{ItemState, Notification, TaskViewModel};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::api::{create_router, AppState, TaskServiceTrait};
    use crate::domain::identity::{ProfileFields, VerificationPurpose};
    use crate::domain::AuthError;
    use crate::infrastructure::identity::{
        FixedCodeGenerator, HttpIdentityProvider, JwtConfig, JwtService, LocalIdentityProvider,
        LocalProviderConfig,
    };
    use crate::infrastructure::task::{InMemoryTaskRepository, TaskService};

    /// Serve the full router with the local provider on an ephemeral port
    async fn spawn_gateway() -> String {
        let provider = Arc::new(
            LocalIdentityProvider::new(
                JwtService::new(JwtConfig::new("flow-test-secret", 1)),
                LocalProviderConfig::default(),
            )
            .with_code_generator(Arc::new(FixedCodeGenerator::new("123456"))),
        );
        let tasks: Arc<dyn TaskServiceTrait> =
            Arc::new(TaskService::new(Arc::new(InMemoryTaskRepository::new())));
        let state = AppState::new(tasks, provider.clone()).with_local_provider(provider);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, create_router(state, &[])).await });

        format!("http://{}", addr)
    }

    struct Client {
        session: Arc<SessionManager>,
        view_model: TaskViewModel,
    }

    async fn client(base: &str) -> Client {
        let provider = Arc::new(HttpIdentityProvider::new(base, "local-anon-key").unwrap());
        let cache = Arc::new(QueryCache::new());
        let session = Arc::new(SessionManager::new(provider, cache.clone()));
        assert_eq!(session.initialize(None).await, None);

        let api = Arc::new(HttpTaskApi::new(base).unwrap());
        let (view_model, _) = TaskViewModel::new(api, session.clone(), cache);

        Client {
            session,
            view_model,
        }
    }

    async fn register(session: &SessionManager, email: &str, password: &str) {
        let outcome = session
            .sign_up(email, password, ProfileFields::default())
            .await
            .unwrap();
        assert!(outcome.needs_verification());
        assert!(session.current_identity().is_none());

        session
            .verify_code(email, "123456", VerificationPurpose::Signup)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sign_up_verify_and_manage_todos() {
        let base = spawn_gateway().await;
        let Client {
            session,
            view_model,
        } = client(&base).await;

        register(&session, "alice@x.com", "secret1").await;
        let alice = session.current_identity().unwrap();
        assert_eq!(alice.email(), "alice@x.com");

        assert_ok!(view_model.refresh().await);
        assert!(view_model.tasks().await.is_empty());

        assert_ok!(view_model.add("Write spec").await);
        let tasks = view_model.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title(), "Write spec");
        assert!(!tasks[0].is_completed());
        assert!(tasks[0].is_owned_by(alice.id()));
        assert_eq!(view_model.active_count().await, 1);

        let id = *tasks[0].id();
        assert_ok!(view_model.toggle(id, true).await);
        assert!(view_model.tasks().await[0].is_completed());
        assert_eq!(view_model.active_count().await, 0);
        assert_eq!(view_model.item_state(&id), ItemState::Idle);

        assert_ok!(view_model.delete(id).await);
        assert!(view_model.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_unverified_and_wrong_password_sign_in() {
        let base = spawn_gateway().await;
        let Client { session, .. } = client(&base).await;

        session
            .sign_up("carol@x.com", "secret1", ProfileFields::default())
            .await
            .unwrap();
        let err = session.sign_in("carol@x.com", "secret1").await.unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::EmailNotVerified));

        session
            .verify_code("carol@x.com", "123456", VerificationPurpose::Signup)
            .await
            .unwrap();
        assert_ok!(session.sign_out().await);

        let err = session.sign_in("carol@x.com", "wrong-pass").await.unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::InvalidCredentials));
        assert!(session.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_identities_are_isolated_across_sign_out() {
        let base = spawn_gateway().await;
        let Client {
            session,
            view_model,
        } = client(&base).await;

        register(&session, "alice@x.com", "secret1").await;
        assert_ok!(view_model.add("Alice's todo").await);
        let alice_token = session.access_token().unwrap();

        assert_ok!(session.sign_out().await);
        assert!(view_model.tasks().await.is_empty());

        // A signed-out token no longer passes the gateway
        let api = HttpTaskApi::new(base.as_str()).unwrap();
        let err = assert_err!(api.list(&alice_token).await);
        assert_eq!(err.auth_error(), Some(&AuthError::InvalidToken));

        register(&session, "bob@x.com", "secret2").await;
        assert_ok!(view_model.refresh().await);
        assert!(view_model.tasks().await.is_empty());

        assert_ok!(session.sign_out().await);
        session.sign_in("alice@x.com", "secret1").await.unwrap();
        assert_ok!(view_model.refresh().await);

        let tasks = view_model.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title(), "Alice's todo");
    }
}
