//! Wire types for the todo endpoints

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::task::{validate_title, Task, TaskPatch, TaskValidationError};

/// Task as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    pub id: String,
    pub title: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

impl From<&Task> for TodoResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().to_string(),
            title: task.title().to_string(),
            is_completed: task.is_completed(),
            created_at: task.created_at(),
            user_id: task.owner_id().as_str().to_string(),
        }
    }
}

/// `POST /api/todos` body
///
/// The owner always comes from the bearer credential; any attempt to send
/// one is rejected as an unknown field.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTodoRequest {
    #[validate(custom(function = "title_rule"))]
    pub title: String,
    /// Accepted for client convenience; new tasks always start open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl CreateTodoRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            is_completed: None,
        }
    }
}

/// `PATCH /api/todos/{id}` body
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "requires_change"))]
pub struct UpdateTodoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "title_rule"))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl From<UpdateTodoRequest> for TaskPatch {
    fn from(request: UpdateTodoRequest) -> Self {
        TaskPatch {
            title: request.title,
            is_completed: request.is_completed,
        }
    }
}

impl From<&TaskPatch> for UpdateTodoRequest {
    fn from(patch: &TaskPatch) -> Self {
        Self {
            title: patch.title.clone(),
            is_completed: patch.is_completed,
        }
    }
}

fn title_rule(title: &str) -> Result<(), ValidationError> {
    validate_title(title).map(|_| ()).map_err(|err| {
        let code = match err {
            TaskValidationError::TitleTooLong(_) => "length",
            _ => "blank",
        };
        ValidationError::new(code).with_message(Cow::Owned(err.to_string()))
    })
}

fn requires_change(request: &UpdateTodoRequest) -> Result<(), ValidationError> {
    if request.title.is_none() && request.is_completed.is_none() {
        let err = TaskValidationError::EmptyPatch;
        return Err(ValidationError::new("empty_patch").with_message(Cow::Owned(err.to_string())));
    }
    Ok(())
}

/// `GET /api/config` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfigResponse {
    pub provider_url: String,
    pub provider_key: String,
}
