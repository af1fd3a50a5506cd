//! Scripted transport shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<HttpResponse, ApiError>>,
    requests: Vec<HttpRequest>,
}

/// Replays canned responses in order and records every request it sees.
///
/// A gated transport holds each response until the test calls
/// `notify_one` on the returned `Notify`.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = Result<HttpResponse, ApiError>>) -> Self {
        let script = Script {
            responses: responses.into_iter().collect(),
            requests: Vec::new(),
        };
        Self {
            script: Arc::new(Mutex::new(script)),
            gate: None,
        }
    }

    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn push(&self, response: Result<HttpResponse, ApiError>) {
        self.script.lock().unwrap().responses.push_back(response);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().unwrap().requests.clone()
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let next = {
            let mut script = self.script.lock().unwrap();
            script.requests.push(request);
            script.responses.pop_front()
        };
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        next.unwrap_or_else(|| Err(ApiError::Transport("no scripted response".to_string())))
    }
}

/// One row as the backend would render it; `minute` drives `created_at`.
pub fn row_json(id: &str, task: &str, completed: bool, minute: u32) -> String {
    serde_json::json!({
        "id": id,
        "task": task,
        "completed": completed,
        "created_at": format!("2024-05-01T10:{minute:02}:00+00:00"),
    })
    .to_string()
}

pub fn rows(status: u16, rows: &[String]) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::new(status, format!("[{}]", rows.join(","))))
}

pub fn failure(status: u16, message: &str) -> Result<HttpResponse, ApiError> {
    let body = serde_json::json!({"code": "XX000", "message": message}).to_string();
    Ok(HttpResponse::new(status, body))
}
