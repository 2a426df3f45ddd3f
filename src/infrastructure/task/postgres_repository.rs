//! PostgreSQL task repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::identity::IdentityId;
use crate::domain::task::{Task, TaskId, TaskPatch, TaskRepository};
use crate::domain::DomainError;

/// PostgreSQL implementation of TaskRepository
///
/// Each statement runs in its own transaction with `app.current_user_id`
/// set to the acting owner, which the `todos_owner_isolation` row-level
/// security policy checks in addition to the explicit `user_id` predicate.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin_scoped(
        &self,
        owner_id: &IdentityId,
    ) -> Result<Transaction<'static, Postgres>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query("SELECT set_config('app.current_user_id', $1, true)")
            .bind(owner_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to scope transaction: {}", e)))?;

        Ok(tx)
    }

    async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), DomainError> {
        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit transaction: {}", e)))
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn list(&self, owner_id: &IdentityId) -> Result<Vec<Task>, DomainError> {
        let mut tx = self.begin_scoped(owner_id).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, is_completed, created_at
            FROM todos
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list todos: {}", e)))?;

        Self::commit(tx).await?;

        rows.iter().map(row_to_task).collect()
    }

    async fn get(&self, id: &TaskId, owner_id: &IdentityId) -> Result<Option<Task>, DomainError> {
        let mut tx = self.begin_scoped(owner_id).await?;

        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, is_completed, created_at
            FROM todos
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(owner_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get todo: {}", e)))?;

        Self::commit(tx).await?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn create(&self, task: Task) -> Result<Task, DomainError> {
        let mut tx = self.begin_scoped(task.owner_id()).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO todos (id, user_id, title, is_completed, created_at)
            VALUES ($1, $2, $3, FALSE, $4)
            RETURNING id, user_id, title, is_completed, created_at
            "#,
        )
        .bind(task.id().as_uuid())
        .bind(task.owner_id().as_str())
        .bind(task.title())
        .bind(task.created_at())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create todo: {}", e)))?;

        Self::commit(tx).await?;

        row_to_task(&row)
    }

    async fn update(
        &self,
        id: &TaskId,
        owner_id: &IdentityId,
        patch: &TaskPatch,
    ) -> Result<Task, DomainError> {
        let mut tx = self.begin_scoped(owner_id).await?;

        let row = sqlx::query(
            r#"
            UPDATE todos
            SET title = COALESCE($3, title),
                is_completed = COALESCE($4, is_completed)
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, is_completed, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(owner_id.as_str())
        .bind(patch.title.as_deref())
        .bind(patch.is_completed)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update todo: {}", e)))?;

        Self::commit(tx).await?;

        match row {
            Some(row) => row_to_task(&row),
            None => Err(DomainError::not_found(format!("Todo '{}' not found", id))),
        }
    }

    async fn delete(&self, id: &TaskId, owner_id: &IdentityId) -> Result<bool, DomainError> {
        let mut tx = self.begin_scoped(owner_id).await?;

        let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(owner_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete todo: {}", e)))?;

        Self::commit(tx).await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Database unreachable: {}", e)))?;

        Ok(())
    }
}

fn row_to_task(row: &sqlx::postgres::PgRow) -> Result<Task, DomainError> {
    let id: Uuid = column(row, "id")?;
    let user_id: String = column(row, "user_id")?;
    let title: String = column(row, "title")?;
    let is_completed: bool = column(row, "is_completed")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;

    Ok(Task::restore(
        TaskId::from_uuid(id),
        IdentityId::new(user_id),
        title,
        is_completed,
        created_at,
    ))
}

fn column<'r, T>(row: &'r sqlx::postgres::PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::storage(format!("Invalid '{}' column in database: {}", name, e)))
}
