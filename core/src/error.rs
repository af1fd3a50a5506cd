//! Error types for the todo client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers distinguish "the row
//! does not exist" from "the backend returned an unexpected status." All
//! other non-2xx responses land in `HttpError` with the status code and the
//! backend's error message for debugging. Validation failures are a separate
//! type: they are detected before any request is built.

use thiserror::Error;

use crate::types::TodoId;

/// Errors from building, executing or parsing a backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend reported that no row matched the requested id.
    #[error("todo not found")]
    NotFound,

    /// The backend returned a non-2xx status other than 404.
    #[error("HTTP {status}: {message}")]
    HttpError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request never produced a response (connection, TLS, timeout).
    #[error("transport failed: {0}")]
    Transport(String),
}

/// Input rejected locally, before any remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task must not be empty")]
    EmptyTask,

    #[error("update must change at least one field")]
    EmptyPatch,
}

/// Errors returned by `TodoListController` mutations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] ApiError),

    /// Another add is still waiting for the backend.
    #[error("a todo is already being added")]
    AddInFlight,

    /// Another mutation of the same todo is still waiting for the backend.
    #[error("todo {0} has a change in flight")]
    ItemBusy(TodoId),

    /// The controller was closed; local state is no longer updated.
    #[error("todo list is closed")]
    Closed,
}

/// Errors from a `KeyValueStorage` backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// Errors while reading backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("backend url must start with http:// or https://, got {0:?}")]
    InvalidUrl(String),
}
