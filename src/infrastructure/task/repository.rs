//! In-memory task repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::identity::IdentityId;
use crate::domain::task::{sort_newest_first, Task, TaskId, TaskPatch, TaskRepository};
use crate::domain::DomainError;

/// In-memory implementation of TaskRepository
///
/// Rows are partitioned by owner, so a lookup can only ever see the
/// acting owner's partition.
#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<IdentityId, HashMap<TaskId, Task>>>>,
}

impl InMemoryTaskRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository with initial tasks
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let mut partitions: HashMap<IdentityId, HashMap<TaskId, Task>> = HashMap::new();

        for task in tasks {
            partitions
                .entry(task.owner_id().clone())
                .or_default()
                .insert(*task.id(), task);
        }

        Self {
            tasks: Arc::new(RwLock::new(partitions)),
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn list(&self, owner_id: &IdentityId) -> Result<Vec<Task>, DomainError> {
        let tasks = self.tasks.read().await;

        let mut result: Vec<Task> = tasks
            .get(owner_id)
            .map(|partition| partition.values().cloned().collect())
            .unwrap_or_default();

        sort_newest_first(&mut result);

        Ok(result)
    }

    async fn get(&self, id: &TaskId, owner_id: &IdentityId) -> Result<Option<Task>, DomainError> {
        let tasks = self.tasks.read().await;

        Ok(tasks
            .get(owner_id)
            .and_then(|partition| partition.get(id))
            .cloned())
    }

    async fn create(&self, task: Task) -> Result<Task, DomainError> {
        let mut tasks = self.tasks.write().await;
        let partition = tasks.entry(task.owner_id().clone()).or_default();

        if partition.contains_key(task.id()) {
            return Err(DomainError::storage(format!(
                "Todo '{}' already exists",
                task.id()
            )));
        }

        partition.insert(*task.id(), task.clone());

        Ok(task)
    }

    async fn update(
        &self,
        id: &TaskId,
        owner_id: &IdentityId,
        patch: &TaskPatch,
    ) -> Result<Task, DomainError> {
        let mut tasks = self.tasks.write().await;

        let task = tasks
            .get_mut(owner_id)
            .and_then(|partition| partition.get_mut(id))
            .ok_or_else(|| DomainError::not_found(format!("Todo '{}' not found", id)))?;

        task.apply(patch);

        Ok(task.clone())
    }

    async fn delete(&self, id: &TaskId, owner_id: &IdentityId) -> Result<bool, DomainError> {
        let mut tasks = self.tasks.write().await;

        Ok(tasks
            .get_mut(owner_id)
            .map(|partition| partition.remove(id).is_some())
            .unwrap_or(false))
    }
}
