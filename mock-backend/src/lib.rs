//! In-memory stand-in for the hosted `todos` table.
//!
//! Speaks the subset of the PostgREST dialect the client uses: the table
//! lives at `/rest/v1/todos`, rows are filtered with `id=eq.<uuid>`, sorted
//! with `order=created_at.desc|asc`, and writes echo the affected rows only
//! when the request carries `Prefer: return=representation`. Every request
//! must present the configured key in the `apikey` header.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_API_KEY: &str = "mock-anon-key";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: Uuid,
    pub task: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct NewRow {
    pub task: String,
    #[serde(default)]
    pub completed: bool,
}

/// Inserts accept a single object or an array of objects.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum InsertBody {
    Many(Vec<NewRow>),
    One(NewRow),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRow {
    pub task: Option<String>,
    pub completed: Option<bool>,
}

/// Rows in insertion order; `created_at` strictly increases.
#[derive(Debug, Default)]
pub struct Table {
    rows: Vec<Todo>,
    last_created: Option<DateTime<Utc>>,
}

impl Table {
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_created {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_created = Some(now);
        now
    }
}

pub type Db = Arc<RwLock<Table>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    api_key: Arc<str>,
}

/// A PostgREST-shaped error body.
#[derive(Debug)]
struct Failure {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "code": self.code,
            "message": self.message,
            "details": null,
            "hint": null,
        });
        (self.status, Json(body)).into_response()
    }
}

type Params = Query<HashMap<String, String>>;

pub fn app() -> Router {
    app_with_key(DEFAULT_API_KEY)
}

pub fn app_with_key(api_key: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Table::default())),
        api_key: Arc::from(api_key),
    };
    Router::new()
        .route(
            "/rest/v1/todos",
            get(list_todos)
                .post(insert_todos)
                .patch(update_todos)
                .delete(delete_todos),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_key(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_key(api_key)).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Failure> {
    let presented = headers.get("apikey").and_then(|v| v.to_str().ok());
    if presented == Some(&*state.api_key) {
        return Ok(());
    }
    Err(Failure::new(
        StatusCode::UNAUTHORIZED,
        "PGRST301",
        "No API key found in request",
    ))
}

fn wants_representation(headers: &HeaderMap) -> bool {
    headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|p| p.trim() == "return=representation"))
}

/// The `id=eq.<uuid>` filter, if present.
fn id_filter(params: &HashMap<String, String>) -> Result<Option<Uuid>, Failure> {
    let Some(raw) = params.get("id") else {
        return Ok(None);
    };
    let value = raw.strip_prefix("eq.").ok_or_else(|| {
        Failure::new(
            StatusCode::BAD_REQUEST,
            "PGRST100",
            format!("unsupported filter on id: {raw}"),
        )
    })?;
    value.parse().map(Some).map_err(|_| {
        Failure::new(
            StatusCode::BAD_REQUEST,
            "22P02",
            format!("invalid input syntax for type uuid: \"{value}\""),
        )
    })
}

fn selected(filter: Option<Uuid>, todo: &Todo) -> bool {
    filter.is_none_or(|id| todo.id == id)
}

fn check_task(task: &str) -> Result<(), Failure> {
    if task.trim().is_empty() {
        return Err(Failure::new(
            StatusCode::BAD_REQUEST,
            "23514",
            "new row for relation \"todos\" violates check constraint \"todos_task_check\"",
        ));
    }
    Ok(())
}

fn written(headers: &HeaderMap, success: StatusCode, rows: Vec<Todo>) -> Response {
    if wants_representation(headers) {
        (success, Json(rows)).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn list_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Params,
) -> Result<Json<Vec<Todo>>, Failure> {
    authorize(&state, &headers)?;
    let filter = id_filter(&params)?;
    let table = state.db.read().await;
    let mut rows: Vec<Todo> = table
        .rows
        .iter()
        .filter(|todo| selected(filter, todo))
        .cloned()
        .collect();
    match params.get("order").map(String::as_str) {
        None => {}
        Some("created_at.asc") => rows.sort_by_key(|todo| todo.created_at),
        Some("created_at.desc") => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        Some(other) => {
            return Err(Failure::new(
                StatusCode::BAD_REQUEST,
                "PGRST100",
                format!("unsupported order: {other}"),
            ))
        }
    }
    debug!(count = rows.len(), "list todos");
    Ok(Json(rows))
}

async fn insert_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<InsertBody>,
) -> Result<Response, Failure> {
    authorize(&state, &headers)?;
    let new_rows = match body {
        InsertBody::Many(rows) => rows,
        InsertBody::One(row) => vec![row],
    };
    for row in &new_rows {
        check_task(&row.task)?;
    }

    let mut table = state.db.write().await;
    let mut inserted = Vec::with_capacity(new_rows.len());
    for row in new_rows {
        let todo = Todo {
            id: Uuid::new_v4(),
            task: row.task,
            completed: row.completed,
            created_at: table.next_created_at(),
        };
        table.rows.push(todo.clone());
        inserted.push(todo);
    }
    debug!(count = inserted.len(), "insert todos");
    if wants_representation(&headers) {
        Ok((StatusCode::CREATED, Json(inserted)).into_response())
    } else {
        Ok(StatusCode::CREATED.into_response())
    }
}

async fn update_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Params,
    Json(input): Json<UpdateRow>,
) -> Result<Response, Failure> {
    authorize(&state, &headers)?;
    let filter = id_filter(&params)?;
    if let Some(task) = &input.task {
        check_task(task)?;
    }

    let mut table = state.db.write().await;
    let mut updated = Vec::new();
    for todo in table.rows.iter_mut().filter(|todo| selected(filter, todo)) {
        if let Some(task) = &input.task {
            todo.task.clone_from(task);
        }
        if let Some(completed) = input.completed {
            todo.completed = completed;
        }
        updated.push(todo.clone());
    }
    debug!(count = updated.len(), "update todos");
    Ok(written(&headers, StatusCode::OK, updated))
}

async fn delete_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Params,
) -> Result<Response, Failure> {
    authorize(&state, &headers)?;
    let filter = id_filter(&params)?;

    let mut table = state.db.write().await;
    let (deleted, kept): (Vec<Todo>, Vec<Todo>) = std::mem::take(&mut table.rows)
        .into_iter()
        .partition(|todo| selected(filter, todo));
    table.rows = kept;
    debug!(count = deleted.len(), "delete todos");
    Ok(written(&headers, StatusCode::OK, deleted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_serializes_to_json() {
        let todo = Todo {
            id: Uuid::nil(),
            task: "Test".to_string(),
            completed: false,
            created_at: DateTime::from_timestamp(0, 0).unwrap(),
        };
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["task"], "Test");
        assert_eq!(json["completed"], false);
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn insert_body_accepts_object_or_array() {
        let one: InsertBody = serde_json::from_str(r#"{"task":"One"}"#).unwrap();
        assert!(matches!(one, InsertBody::One(ref row) if row.task == "One" && !row.completed));
        let many: InsertBody =
            serde_json::from_str(r#"[{"task":"A"},{"task":"B","completed":true}]"#).unwrap();
        assert!(matches!(many, InsertBody::Many(ref rows) if rows.len() == 2 && rows[1].completed));
    }

    #[test]
    fn new_row_rejects_missing_task() {
        let result: Result<NewRow, _> = serde_json::from_str(r#"{"completed":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_row_rejects_unknown_columns() {
        let result: Result<UpdateRow, _> = serde_json::from_str(r#"{"title":"x"}"#);
        assert!(result.is_err());
        let empty: UpdateRow = serde_json::from_str("{}").unwrap();
        assert!(empty.task.is_none() && empty.completed.is_none());
    }

    #[test]
    fn created_at_strictly_increases() {
        let mut table = Table::default();
        let first = table.next_created_at();
        let second = table.next_created_at();
        assert!(second > first);
    }

    #[test]
    fn id_filter_parsing() {
        let mut params = HashMap::new();
        assert_eq!(id_filter(&params).unwrap(), None);
        params.insert("id".to_string(), format!("eq.{}", Uuid::nil()));
        assert_eq!(id_filter(&params).unwrap(), Some(Uuid::nil()));
        params.insert("id".to_string(), "eq.not-a-uuid".to_string());
        assert_eq!(id_filter(&params).unwrap_err().code, "22P02");
        params.insert("id".to_string(), "gt.5".to_string());
        assert_eq!(id_filter(&params).unwrap_err().status, StatusCode::BAD_REQUEST);
    }
}
