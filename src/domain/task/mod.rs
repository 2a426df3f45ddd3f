//! Task domain
//!
//! The flat list of owned to-do items and the repository port that
//! persists them.

mod entity;
mod repository;
mod validation;

pub use entity::{sort_newest_first, Task, TaskId, TaskPatch};
pub use repository::TaskRepository;
pub use validation::{validate_title, TaskValidationError, MAX_TITLE_LENGTH};

#[cfg(test)]
pub use repository::MockTaskRepository;
