//! Task repository trait

use async_trait::async_trait;

use super::entity::{Task, TaskId, TaskPatch};
use crate::domain::identity::IdentityId;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Persistence for tasks
///
/// Every operation takes the acting owner and must apply it inside the
/// store's own predicate, so a row belonging to another owner behaves
/// exactly like a row that does not exist.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks of an owner, newest first
    async fn list(&self, owner_id: &IdentityId) -> Result<Vec<Task>, DomainError>;

    /// A single task, if it exists and belongs to the owner
    async fn get(&self, id: &TaskId, owner_id: &IdentityId) -> Result<Option<Task>, DomainError>;

    /// Insert a new task
    async fn create(&self, task: Task) -> Result<Task, DomainError>;

    /// Apply a partial update; `NotFound` when no row matches id and owner
    async fn update(
        &self,
        id: &TaskId,
        owner_id: &IdentityId,
        patch: &TaskPatch,
    ) -> Result<Task, DomainError>;

    /// Delete a task; `false` when no row matches id and owner
    async fn delete(&self, id: &TaskId, owner_id: &IdentityId) -> Result<bool, DomainError>;

    /// Verify the backing store is reachable
    async fn health_check(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
