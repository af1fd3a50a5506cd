//! Backend session persisted across restarts.
//!
//! The session is stored as JSON under `sb-<project ref>-auth-token`, the key
//! the hosted backend's own clients use. Signing in is outside this crate;
//! whoever obtains a token hands it to `SessionStore::save`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StorageError;
use crate::storage::KeyValueStorage;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

pub struct SessionStore<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> SessionStore<S> {
    pub fn new(storage: S, project_ref: &str) -> Self {
        Self {
            storage,
            key: format!("sb-{project_ref}-auth-token"),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The stored session, if any. Expired or unreadable entries, and a
    /// malformed storage file, are removed and reported as absent.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Option<Session>, StorageError> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(StorageError::Format(e)) => {
                warn!(key = %self.key, error = %e, "discarding malformed session storage");
                self.storage.remove(&self.key)?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if session.is_expired(now) => {
                warn!(key = %self.key, "discarding expired session");
                self.storage.remove(&self.key)?;
                Ok(None)
            }
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding unreadable session");
                self.storage.remove(&self.key)?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let raw = serde_json::to_string(session)?;
        self.storage.set(&self.key, &raw)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key)
    }
}
