//! Client core for a todo list kept in a hosted `todos` table.
//!
//! # Overview
//! `TodoClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network (host-does-IO pattern). A `Transport`
//! executes them; `TodoStore` chains the two into the five remote
//! operations, and `TodoListController` keeps an in-memory list reconciled
//! with every successful call.
//!
//! # Design
//! - `TodoClient` holds only the base url and credentials.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and the mapping is testable without a server.
//! - Nothing is global: the application assembles client, transport, store
//!   and controller and passes them down.
//! - The session token lives behind `KeyValueStorage`, not in the client.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod session;
pub mod storage;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

pub use client::TodoClient;
pub use config::BackendConfig;
pub use controller::{ListSnapshot, TodoListController};
pub use error::{ApiError, ConfigError, ControllerError, StorageError, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{Session, SessionStore};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::TodoStore;
pub use transport::{ReqwestTransport, Transport};
pub use types::{NewTodo, Todo, TodoId, TodoPatch};
