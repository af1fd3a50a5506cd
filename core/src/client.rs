//! Stateless HTTP request builder and response parser for the `todos` table.
//!
//! # Design
//! `TodoClient` holds the base url and credentials and carries no other
//! state between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The requests follow the PostgREST conventions of the
//! hosted backend: filters in the query string, `Prefer:
//! return=representation` to get affected rows back as a JSON array.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{NewTodo, Todo, TodoId, TodoPatch};

/// Table every request targets.
pub const TABLE: &str = "todos";

/// Characters left as-is inside a filter value.
const FILTER_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Synchronous, stateless client for the hosted `todos` table.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl TodoClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
        }
    }

    /// Use a session token instead of the anon key as bearer credential.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list_todos(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}?select=*&order=created_at.desc", self.table_url()),
            headers: self.auth_headers(),
            body: None,
        }
    }

    pub fn build_create_todo(&self, input: &NewTodo) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(&[input])
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}?select=*", self.table_url()),
            headers: self.write_headers(),
            body: Some(body),
        })
    }

    pub fn build_update_todo(&self, id: &TodoId, patch: &TodoPatch) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(patch)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Patch,
            url: format!("{}?id=eq.{}&select=*", self.table_url(), encode_id(id)),
            headers: self.write_headers(),
            body: Some(body),
        })
    }

    pub fn build_toggle_todo(&self, id: &TodoId, completed: bool) -> Result<HttpRequest, ApiError> {
        self.build_update_todo(id, &TodoPatch::completed(completed))
    }

    pub fn build_delete_todo(&self, id: &TodoId) -> HttpRequest {
        let mut headers = self.auth_headers();
        headers.push(("prefer".to_string(), "return=representation".to_string()));
        HttpRequest {
            method: HttpMethod::Delete,
            url: format!("{}?id=eq.{}", self.table_url(), encode_id(id)),
            headers,
            body: None,
        }
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        check_status(&response, &[200])?;
        parse_rows(&response.body)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response, &[201])?;
        parse_rows(&response.body)?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::DeserializationError("insert returned no row".to_string()))
    }

    /// A filter that matched nothing comes back as `[]`, reported as `NotFound`.
    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response, &[200])?;
        parse_rows(&response.body)?
            .into_iter()
            .next()
            .ok_or(ApiError::NotFound)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, &[200, 204])?;
        if response.status == 204 {
            return Ok(());
        }
        if parse_rows(&response.body)?.is_empty() {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{TABLE}", self.base_url)
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        vec![
            ("apikey".to_string(), self.api_key.clone()),
            ("authorization".to_string(), format!("Bearer {bearer}")),
        ]
    }

    fn write_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.auth_headers();
        headers.push(("content-type".to_string(), "application/json".to_string()));
        headers.push(("prefer".to_string(), "return=representation".to_string()));
        headers
    }
}

fn encode_id(id: &TodoId) -> String {
    utf8_percent_encode(id.as_str(), FILTER_VALUE).to_string()
}

fn parse_rows(body: &str) -> Result<Vec<Todo>, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Error payload the backend sends with non-2xx responses.
#[derive(Deserialize)]
struct BackendErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: &[u16]) -> Result<(), ApiError> {
    if expected.contains(&response.status) {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    let parsed = serde_json::from_str::<BackendErrorBody>(&response.body).ok();
    let code = parsed.as_ref().and_then(|b| b.code.clone());
    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| response.body.clone());
    Err(ApiError::HttpError {
        status: response.status,
        code,
        message,
    })
}
