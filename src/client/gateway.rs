//! Typed client for the todo gateway

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::api::types::{
    ApiErrorResponse, CreateTodoRequest, PublicConfigResponse, TodoResponse, UpdateTodoRequest,
};
use crate::domain::identity::IdentityId;
use crate::domain::task::{Task, TaskId, TaskPatch};
use crate::domain::{AuthError, DomainError};

#[cfg(test)]
use mockall::automock;

/// Task operations as seen from a client holding a bearer token
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self, token: &str) -> Result<Vec<Task>, DomainError>;

    async fn create(&self, token: &str, title: &str) -> Result<Task, DomainError>;

    async fn update(&self, token: &str, id: &TaskId, patch: &TaskPatch) -> Result<Task, DomainError>;

    async fn delete(&self, token: &str, id: &TaskId) -> Result<(), DomainError>;

    async fn public_config(&self) -> Result<PublicConfigResponse, DomainError>;
}

/// `TaskApi` over HTTP
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response, DomainError> {
        let response = request
            .send()
            .await
            .map_err(|e| DomainError::network(format!("Gateway unreachable: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<ApiErrorResponse>().await.ok();
        Err(status_to_error(status, body))
    }

    async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DomainError> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DomainError::network(format!("Malformed gateway response: {}", e)))
    }
}

fn status_to_error(status: StatusCode, body: Option<ApiErrorResponse>) -> DomainError {
    let detail = body.map(|b| b.error);
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::UNAUTHORIZED => AuthError::InvalidToken.into(),
        StatusCode::NOT_FOUND => DomainError::not_found(message),
        StatusCode::BAD_REQUEST => {
            let field = detail
                .and_then(|d| d.field)
                .unwrap_or_else(|| "body".to_string());
            let constraint = message
                .strip_prefix(&format!("{}: ", field))
                .map(str::to_string)
                .unwrap_or(message);
            DomainError::validation(field, constraint)
        }
        _ => DomainError::internal(format!("Gateway returned {}: {}", status.as_u16(), message)),
    }
}

fn into_task(todo: TodoResponse) -> Result<Task, DomainError> {
    let id = TaskId::parse(&todo.id)
        .ok_or_else(|| DomainError::internal(format!("Gateway returned malformed id '{}'", todo.id)))?;

    Ok(Task::restore(
        id,
        IdentityId::new(todo.user_id),
        todo.title,
        todo.is_completed,
        todo.created_at,
    ))
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list(&self, token: &str) -> Result<Vec<Task>, DomainError> {
        let todos: Vec<TodoResponse> = self
            .execute_json(self.client.get(self.url("/todos")).bearer_auth(token))
            .await?;

        todos.into_iter().map(into_task).collect()
    }

    async fn create(&self, token: &str, title: &str) -> Result<Task, DomainError> {
        let request = self
            .client
            .post(self.url("/todos"))
            .bearer_auth(token)
            .json(&CreateTodoRequest::new(title));

        into_task(self.execute_json(request).await?)
    }

    async fn update(&self, token: &str, id: &TaskId, patch: &TaskPatch) -> Result<Task, DomainError> {
        let request = self
            .client
            .patch(self.url(&format!("/todos/{}", id)))
            .bearer_auth(token)
            .json(&UpdateTodoRequest::from(patch));

        into_task(self.execute_json(request).await?)
    }

    async fn delete(&self, token: &str, id: &TaskId) -> Result<(), DomainError> {
        let request = self
            .client
            .delete(self.url(&format!("/todos/{}", id)))
            .bearer_auth(token);

        self.execute(request).await?;
        Ok(())
    }

    async fn public_config(&self) -> Result<PublicConfigResponse, DomainError> {
        self.execute_json(self.client.get(self.url("/config"))).await
    }
}
