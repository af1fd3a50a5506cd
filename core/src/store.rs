//! Remote CRUD adapter over the hosted `todos` table.
//!
//! `TodoStore` pairs a `TodoClient` with a `Transport`: build, execute,
//! parse. It keeps no cache and never retries; failures are logged and
//! handed back to the caller unchanged.

use tracing::{debug, error};

use crate::client::TodoClient;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{NewTodo, Todo, TodoId, TodoPatch};

#[derive(Debug)]
pub struct TodoStore<T> {
    client: TodoClient,
    transport: T,
}

impl<T: Transport> TodoStore<T> {
    pub fn new(client: TodoClient, transport: T) -> Self {
        Self { client, transport }
    }

    /// All rows, newest `created_at` first.
    pub async fn list(&self) -> Result<Vec<Todo>, ApiError> {
        let result = async {
            let response = self.transport.execute(self.client.build_list_todos()).await?;
            self.client.parse_list_todos(response)
        }
        .await;
        if let Ok(todos) = &result {
            debug!(count = todos.len(), "fetched todos");
        }
        log_outcome(result, "fetching todos")
    }

    /// Insert one row and return it with its server-assigned fields.
    pub async fn create(&self, new: &NewTodo) -> Result<Todo, ApiError> {
        let result = async {
            let request = self.client.build_create_todo(new)?;
            let response = self.transport.execute(request).await?;
            self.client.parse_create_todo(response)
        }
        .await;
        log_outcome(result, "creating todo")
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn update(&self, id: &TodoId, patch: &TodoPatch) -> Result<Todo, ApiError> {
        let result = async {
            let request = self.client.build_update_todo(id, patch)?;
            let response = self.transport.execute(request).await?;
            self.client.parse_update_todo(response)
        }
        .await;
        log_outcome(result, "updating todo")
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn delete(&self, id: &TodoId) -> Result<(), ApiError> {
        let result = async {
            let request = self.client.build_delete_todo(id);
            let response = self.transport.execute(request).await?;
            self.client.parse_delete_todo(response)
        }
        .await;
        log_outcome(result, "deleting todo")
    }

    pub async fn toggle(&self, id: &TodoId, completed: bool) -> Result<Todo, ApiError> {
        self.update(id, &TodoPatch::completed(completed)).await
    }
}

fn log_outcome<R>(result: Result<R, ApiError>, action: &str) -> Result<R, ApiError> {
    match &result {
        Ok(_) => debug!("done {action}"),
        Err(e) => error!(error = %e, "error {action}"),
    }
    result
}
