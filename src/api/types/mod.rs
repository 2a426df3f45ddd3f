//! Request and response types for the HTTP surface

pub mod error;
pub mod json;
pub mod todo;

pub use error::{ApiError, ApiErrorDetail, ApiErrorResponse, ApiErrorType};
pub use json::{validation_error, Json, ValidatedJson};
pub use todo::{CreateTodoRequest, PublicConfigResponse, TodoResponse, UpdateTodoRequest};
