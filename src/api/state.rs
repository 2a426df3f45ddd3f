//! Application state for shared services

use std::sync::Arc;

use crate::domain::identity::{IdentityId, IdentityProvider};
use crate::domain::task::{Task, TaskId, TaskPatch, TaskRepository};
use crate::domain::DomainError;
use crate::infrastructure::identity::LocalIdentityProvider;
use crate::infrastructure::task::TaskService;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub task_service: Arc<dyn TaskServiceTrait>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    /// Set when this process is its own identity provider; enables `/auth/v1`
    pub local_provider: Option<Arc<LocalIdentityProvider>>,
    pub public_config: PublicConfig,
}

/// Values clients need to reach the identity provider
#[derive(Debug, Clone, Default)]
pub struct PublicConfig {
    pub provider_url: String,
    pub provider_key: String,
}

impl AppState {
    pub fn new(
        task_service: Arc<dyn TaskServiceTrait>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            task_service,
            identity_provider,
            local_provider: None,
            public_config: PublicConfig::default(),
        }
    }

    /// Use an in-process provider both for token checks and the `/auth/v1` routes
    pub fn with_local_provider(mut self, provider: Arc<LocalIdentityProvider>) -> Self {
        self.identity_provider = provider.clone();
        self.local_provider = Some(provider);
        self
    }

    pub fn with_public_config(mut self, public_config: PublicConfig) -> Self {
        self.public_config = public_config;
        self
    }
}

/// Task operations the handlers depend on
#[async_trait::async_trait]
pub trait TaskServiceTrait: Send + Sync {
    async fn list(&self, owner_id: &IdentityId) -> Result<Vec<Task>, DomainError>;
    async fn get(&self, id: &TaskId, owner_id: &IdentityId) -> Result<Option<Task>, DomainError>;
    async fn create(&self, owner_id: &IdentityId, title: &str) -> Result<Task, DomainError>;
    async fn update(
        &self,
        id: &TaskId,
        owner_id: &IdentityId,
        patch: TaskPatch,
    ) -> Result<Task, DomainError>;
    async fn delete(&self, id: &TaskId, owner_id: &IdentityId) -> Result<bool, DomainError>;
    async fn health_check(&self) -> Result<(), DomainError>;
}

#[async_trait::async_trait]
impl<R: TaskRepository + 'static> TaskServiceTrait for TaskService<R> {
    async fn list(&self, owner_id: &IdentityId) -> Result<Vec<Task>, DomainError> {
        TaskService::list(self, owner_id).await
    }

    async fn get(&self, id: &TaskId, owner_id: &IdentityId) -> Result<Option<Task>, DomainError> {
        TaskService::get(self, id, owner_id).await
    }

    async fn create(&self, owner_id: &IdentityId, title: &str) -> Result<Task, DomainError> {
        TaskService::create(self, owner_id, title).await
    }

    async fn update(
        &self,
        id: &TaskId,
        owner_id: &IdentityId,
        patch: TaskPatch,
    ) -> Result<Task, DomainError> {
        TaskService::update(self, id, owner_id, patch).await
    }

    async fn delete(&self, id: &TaskId, owner_id: &IdentityId) -> Result<bool, DomainError> {
        TaskService::delete(self, id, owner_id).await
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        TaskService::health_check(self).await
    }
}
