//! Domain types for the `todos` table.
//!
//! # Design
//! Rows are fixed-field structs rather than open JSON maps. Creation and
//! partial updates get their own payload types (`NewTodo`, `TodoPatch`) so
//! the fields a caller may send are explicit. `NewTodo` can only be built
//! through its validating constructor, which keeps blank tasks from ever
//! reaching the backend.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Opaque, backend-assigned identifier of a todo.
///
/// Hosted tables hand out either text (uuid) or integer keys; both are kept
/// in their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TodoId(String);

impl TodoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TodoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TodoId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Serialize for TodoId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TodoId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Integer(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Integer(n) => Self(n.to_string()),
        })
    }
}

/// A single row of the `todos` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub task: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new todo. The task is trimmed and never blank.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewTodo {
    task: String,
    completed: bool,
}

impl NewTodo {
    /// Trim `task` and reject it if nothing is left.
    pub fn new(task: &str) -> Result<Self, ValidationError> {
        let task = normalize_task(task)?;
        Ok(Self {
            task,
            completed: false,
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }
}

/// Partial update of a todo. Only the fields present are sent; omitted
/// fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn task(task: impl Into<String>) -> Self {
        Self {
            task: Some(task.into()),
            completed: None,
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            task: None,
            completed: Some(completed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.task.is_none() && self.completed.is_none()
    }

    /// Trim the task text and reject blank tasks and patches with no fields.
    pub fn validated(self) -> Result<Self, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        let task = self.task.as_deref().map(normalize_task).transpose()?;
        Ok(Self {
            task,
            completed: self.completed,
        })
    }

    /// Merge the present fields into `todo`.
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(task) = &self.task {
            todo.task.clone_from(task);
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}

fn normalize_task(task: &str) -> Result<String, ValidationError> {
    let trimmed = task.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTask);
    }
    Ok(trimmed.to_string())
}
