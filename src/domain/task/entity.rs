//! Task entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::identity::IdentityId;

/// Task identifier - a random UUID assigned at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse an identifier taken from a path or wire payload
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single to-do item owned by one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    owner_id: IdentityId,
    title: String,
    is_completed: bool,
    created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new, not yet completed task
    pub fn new(owner_id: IdentityId, title: impl Into<String>) -> Self {
        Self {
            id: TaskId::generate(),
            owner_id,
            title: title.into(),
            is_completed: false,
            created_at: Utc::now(),
        }
    }

    /// Rebuild a task from persisted fields
    pub fn restore(
        id: TaskId,
        owner_id: IdentityId,
        title: impl Into<String>,
        is_completed: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            title: title.into(),
            is_completed,
            created_at,
        }
    }

    // Getters

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn owner_id(&self) -> &IdentityId {
        &self.owner_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_owned_by(&self, owner_id: &IdentityId) -> bool {
        &self.owner_id == owner_id
    }

    /// Apply the supplied fields of a patch in place
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }

        if let Some(is_completed) = patch.is_completed {
            self.is_completed = is_completed;
        }
    }
}

/// Partial update of a task; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            is_completed: None,
        }
    }

    pub fn completion(is_completed: bool) -> Self {
        Self {
            title: None,
            is_completed: Some(is_completed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.is_completed.is_none()
    }
}

/// Sort tasks newest first
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
