//! `/api/todos` handlers
//!
//! The owner of every task touched here is the identity behind the bearer
//! token; nothing in the request body or path can name another owner.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Router,
};
use tracing::info;

use crate::api::middleware::RequireIdentity;
use crate::api::state::AppState;
use crate::api::types::{
    ApiError, CreateTodoRequest, Json, PublicConfigResponse, TodoResponse, UpdateTodoRequest,
    ValidatedJson,
};
use crate::domain::task::TaskId;

pub fn create_todos_router() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", patch(update_todo).delete(delete_todo))
        .route("/config", get(public_config))
}

/// Malformed ids cannot match a row, so they read as missing
fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    TaskId::parse(raw).ok_or_else(|| ApiError::not_found("Todo not found"))
}

/// GET /api/todos
pub async fn list_todos(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
) -> Result<Json<Vec<TodoResponse>>, ApiError> {
    let tasks = state.task_service.list(identity.id()).await?;
    Ok(Json(tasks.iter().map(TodoResponse::from).collect()))
}

/// POST /api/todos
pub async fn create_todo(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    ValidatedJson(request): ValidatedJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    let task = state.task_service.create(identity.id(), &request.title).await?;
    info!(identity_id = %identity.id(), task_id = %task.id(), "Todo created");

    Ok((StatusCode::CREATED, Json(TodoResponse::from(&task))))
}

/// PATCH /api/todos/{id}
pub async fn update_todo(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>, ApiError> {
    let id = parse_task_id(&id)?;
    let task = state
        .task_service
        .update(&id, identity.id(), request.into())
        .await?;

    Ok(Json(TodoResponse::from(&task)))
}

/// DELETE /api/todos/{id}
pub async fn delete_todo(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_task_id(&id)?;

    if state.task_service.delete(&id, identity.id()).await? {
        info!(identity_id = %identity.id(), task_id = %id, "Todo deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Todo not found"))
    }
}

/// GET /api/config
///
/// Public; lets a client discover where to authenticate.
pub async fn public_config(State(state): State<AppState>) -> Json<PublicConfigResponse> {
    Json(PublicConfigResponse {
        provider_url: state.public_config.provider_url.clone(),
        provider_key: state.public_config.provider_key.clone(),
    })
}
