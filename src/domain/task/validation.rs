//! Task validation utilities

use thiserror::Error;

use crate::domain::DomainError;

/// Errors that can occur during task validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskValidationError {
    #[error("must not be empty")]
    EmptyTitle,

    #[error("must be at most {0} characters")]
    TitleTooLong(usize),

    #[error("at least one of title, isCompleted is required")]
    EmptyPatch,
}

pub const MAX_TITLE_LENGTH: usize = 500;

/// Validate a title and return its trimmed form
///
/// Rules:
/// - Not empty after trimming surrounding whitespace
/// - Maximum 500 characters after trimming
pub fn validate_title(title: &str) -> Result<String, TaskValidationError> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }

    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(TaskValidationError::TitleTooLong(MAX_TITLE_LENGTH));
    }

    Ok(trimmed.to_string())
}

impl TaskValidationError {
    /// Name of the offending field on the wire
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyTitle | Self::TitleTooLong(_) => "title",
            Self::EmptyPatch => "body",
        }
    }
}

impl From<TaskValidationError> for DomainError {
    fn from(err: TaskValidationError) -> Self {
        DomainError::validation(err.field(), err.to_string())
    }
}
