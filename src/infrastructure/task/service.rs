//! Task service: validation and ownership scoping over a TaskRepository

use std::sync::Arc;

use tracing::debug;

use crate::domain::identity::IdentityId;
use crate::domain::task::{validate_title, Task, TaskId, TaskPatch, TaskRepository, TaskValidationError};
use crate::domain::DomainError;

/// Task service for a single owner's to-do list
#[derive(Debug)]
pub struct TaskService<R: TaskRepository> {
    repository: Arc<R>,
}

impl<R: TaskRepository> TaskService<R> {
    /// Create a new task service
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// List an owner's tasks, newest first
    pub async fn list(&self, owner_id: &IdentityId) -> Result<Vec<Task>, DomainError> {
        self.repository.list(owner_id).await
    }

    /// Get one of the owner's tasks
    pub async fn get(&self, id: &TaskId, owner_id: &IdentityId) -> Result<Option<Task>, DomainError> {
        self.repository.get(id, owner_id).await
    }

    /// Create a task; the title is trimmed and the task always starts incomplete
    pub async fn create(&self, owner_id: &IdentityId, title: &str) -> Result<Task, DomainError> {
        let title = validate_title(title)?;

        let task = Task::new(owner_id.clone(), title);
        debug!(owner_id = %owner_id, task_id = %task.id(), "Creating todo");

        self.repository.create(task).await
    }

    /// Apply a partial update to one of the owner's tasks
    pub async fn update(
        &self,
        id: &TaskId,
        owner_id: &IdentityId,
        patch: TaskPatch,
    ) -> Result<Task, DomainError> {
        if patch.is_empty() {
            return Err(TaskValidationError::EmptyPatch.into());
        }

        let patch = TaskPatch {
            title: patch.title.as_deref().map(validate_title).transpose()?,
            is_completed: patch.is_completed,
        };

        debug!(owner_id = %owner_id, task_id = %id, "Updating todo");

        self.repository.update(id, owner_id, &patch).await
    }

    /// Delete one of the owner's tasks; `false` when nothing matched
    pub async fn delete(&self, id: &TaskId, owner_id: &IdentityId) -> Result<bool, DomainError> {
        debug!(owner_id = %owner_id, task_id = %id, "Deleting todo");
        self.repository.delete(id, owner_id).await
    }

    /// Check the backing store
    pub async fn health_check(&self) -> Result<(), DomainError> {
        self.repository.health_check().await
    }
}
