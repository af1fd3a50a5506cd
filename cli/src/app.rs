//! Wires config, session, store and controller together for one command.

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use todolist_core::{
    ApiError, BackendConfig, ConfigError, ControllerError, FileStorage, ReqwestTransport,
    Session, SessionStore, StorageError, Todo, TodoClient, TodoListController, TodoPatch,
    TodoStore, Transport,
};
use tracing::{debug, info};

use crate::command::{Command, ItemRef};
use crate::dialogs::Dialogs;
use crate::render::render;

pub const SESSION_FILE_VAR: &str = "TODO_SESSION_FILE";

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no data directory for the session file; set {SESSION_FILE_VAR}")]
    NoDataDir,

    /// The failure was already shown to the user through `Dialogs`.
    #[error("command failed")]
    Reported,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendConfig,
    pub session_file: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        let backend = BackendConfig::from_env()?;
        let session_file = match std::env::var_os(SESSION_FILE_VAR) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => dirs::data_local_dir()
                .ok_or(AppError::NoDataDir)?
                .join("todolist")
                .join("session.json"),
        };
        Ok(Self {
            backend,
            session_file,
        })
    }

    fn sessions(&self) -> SessionStore<FileStorage> {
        SessionStore::new(
            FileStorage::new(&self.session_file),
            self.backend.project_ref(),
        )
    }
}

/// Run one command and return what should be printed on stdout.
pub async fn run(
    command: Command,
    settings: &Settings,
    dialogs: &mut dyn Dialogs,
) -> Result<String, AppError> {
    let sessions = settings.sessions();
    match command {
        Command::Login(token) => {
            sessions.save(&Session::new(token))?;
            info!(key = sessions.key(), "session saved");
            return Ok(format!("Signed in to {}\n", settings.backend.project_ref()));
        }
        Command::Logout => {
            sessions.clear()?;
            return Ok("Signed out\n".to_string());
        }
        _ => {}
    }

    let mut client = TodoClient::new(&settings.backend.url, &settings.backend.anon_key);
    if let Some(session) = sessions.load(Utc::now())? {
        debug!(key = sessions.key(), "using stored session");
        client = client.with_access_token(session.access_token);
    }
    let controller = TodoListController::new(TodoStore::new(client, ReqwestTransport::new()?));

    controller.initial_load().await;
    if let Some(notice) = controller.take_notice().await {
        dialogs.alert("Error", &notice);
    }

    let outcome = execute(command, &controller, dialogs).await;
    let output = render(&controller.snapshot().await);
    controller.close();
    outcome.map(|()| output)
}

pub async fn execute<T: Transport>(
    command: Command,
    controller: &TodoListController<T>,
    dialogs: &mut dyn Dialogs,
) -> Result<(), AppError> {
    match command {
        Command::List | Command::Help | Command::Login(_) | Command::Logout => Ok(()),
        Command::Add(task) => match controller.add(&task).await {
            Ok(_) => Ok(()),
            Err(e) => Err(report(dialogs, &e, "Failed to add todo")),
        },
        Command::Toggle(target) => {
            let Some(todo) = find(controller, &target, dialogs).await else {
                return Err(AppError::Reported);
            };
            match controller.toggle(&todo.id, !todo.completed).await {
                Ok(_) => Ok(()),
                Err(e) => Err(report(dialogs, &e, "Failed to update todo")),
            }
        }
        Command::Edit { target, text } => {
            let Some(todo) = find(controller, &target, dialogs).await else {
                return Err(AppError::Reported);
            };
            let text = match text {
                Some(text) => Some(text),
                None => dialogs.request_text("Edit Todo", "Enter new task:", &todo.task),
            };
            // Cancelled or blank input leaves the todo alone.
            let Some(text) = text.filter(|text| !text.trim().is_empty()) else {
                return Ok(());
            };
            match controller.edit(&todo.id, TodoPatch::task(text)).await {
                Ok(_) => Ok(()),
                Err(e) => Err(report(dialogs, &e, "Failed to update todo")),
            }
        }
        Command::Remove(target) => {
            let Some(todo) = find(controller, &target, dialogs).await else {
                return Err(AppError::Reported);
            };
            if !dialogs.confirm("Delete Todo", "Are you sure you want to delete this todo?") {
                return Ok(());
            }
            match controller.remove(&todo.id).await {
                Ok(()) => Ok(()),
                Err(e) => Err(report(dialogs, &e, "Failed to delete todo")),
            }
        }
    }
}

async fn find<T: Transport>(
    controller: &TodoListController<T>,
    target: &ItemRef,
    dialogs: &mut dyn Dialogs,
) -> Option<Todo> {
    let snapshot = controller.snapshot().await;
    let found = target.resolve(&snapshot.items).cloned();
    if found.is_none() {
        dialogs.alert("Error", &format!("No todo matches {target}"));
    }
    found
}

fn report(dialogs: &mut dyn Dialogs, error: &ControllerError, failed: &str) -> AppError {
    debug!(%error, "command failed");
    match error {
        ControllerError::Validation(_) => dialogs.alert("Error", "Please enter a task"),
        _ => dialogs.alert("Error", failed),
    }
    AppError::Reported
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use mock_backend::DEFAULT_API_KEY;

    use super::*;

    #[derive(Default)]
    struct ScriptedDialogs {
        alerts: Vec<String>,
        confirms: VecDeque<bool>,
        texts: VecDeque<Option<String>>,
    }

    impl Dialogs for ScriptedDialogs {
        fn alert(&mut self, _title: &str, message: &str) {
            self.alerts.push(message.to_string());
        }

        fn confirm(&mut self, _title: &str, _message: &str) -> bool {
            self.confirms.pop_front().unwrap_or(false)
        }

        fn request_text(&mut self, _title: &str, _message: &str, _initial: &str) -> Option<String> {
            self.texts.pop_front().flatten()
        }
    }

    async fn settings(dir: &tempfile::TempDir) -> Settings {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(mock_backend::run(listener));
        Settings {
            backend: BackendConfig {
                url: format!("http://{addr}"),
                anon_key: DEFAULT_API_KEY.to_string(),
            },
            session_file: dir.path().join("session.json"),
        }
    }

    async fn run_line(
        settings: &Settings,
        dialogs: &mut ScriptedDialogs,
        line: &str,
    ) -> Result<String, AppError> {
        let args = line.split_whitespace().map(str::to_string);
        let command = crate::command::parse(args).unwrap();
        run(command, settings, dialogs).await
    }

    #[tokio::test]
    async fn add_toggle_edit_remove_through_the_cli() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir).await;
        let mut dialogs = ScriptedDialogs::default();

        let out = run_line(&settings, &mut dialogs, "list").await.unwrap();
        assert!(out.contains("No todos yet"));

        run_line(&settings, &mut dialogs, "add Buy milk").await.unwrap();
        let out = run_line(&settings, &mut dialogs, "add Write docs").await.unwrap();
        assert!(out.contains("0 of 2 completed"));
        assert!(out.contains("#1   [ ] Write docs"));

        let out = run_line(&settings, &mut dialogs, "toggle #2").await.unwrap();
        assert!(out.contains("1 of 2 completed"));
        assert!(out.contains("#2   [x] Buy milk"));

        dialogs.texts.push_back(Some("Buy oat milk".to_string()));
        let out = run_line(&settings, &mut dialogs, "edit #2").await.unwrap();
        assert!(out.contains("#2   [x] Buy oat milk"));

        dialogs.confirms.push_back(false);
        let out = run_line(&settings, &mut dialogs, "rm #1").await.unwrap();
        assert!(out.contains("Write docs"));

        dialogs.confirms.push_back(true);
        let out = run_line(&settings, &mut dialogs, "rm #1").await.unwrap();
        assert!(!out.contains("Write docs"));
        assert!(out.contains("1 of 1 completed"));
        assert!(dialogs.alerts.is_empty());
    }

    #[tokio::test]
    async fn failures_are_alerted_once() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir).await;
        let mut dialogs = ScriptedDialogs::default();

        let err = run_line(&settings, &mut dialogs, "add").await.unwrap_err();
        assert!(matches!(err, AppError::Reported));
        let err = run_line(&settings, &mut dialogs, "toggle #3").await.unwrap_err();
        assert!(matches!(err, AppError::Reported));
        assert_eq!(dialogs.alerts, ["Please enter a task", "No todo matches #3"]);
    }

    #[tokio::test]
    async fn cancelled_edit_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir).await;
        let mut dialogs = ScriptedDialogs::default();
        run_line(&settings, &mut dialogs, "add Buy milk").await.unwrap();

        dialogs.texts.push_back(None);
        let out = run_line(&settings, &mut dialogs, "edit #1").await.unwrap();
        assert!(out.contains("Buy milk"));
        assert!(dialogs.alerts.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_shows_the_load_notice() {
        let dir = tempfile::tempdir().unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let settings = Settings {
            backend: BackendConfig {
                url: format!("http://{addr}"),
                anon_key: DEFAULT_API_KEY.to_string(),
            },
            session_file: dir.path().join("session.json"),
        };
        let mut dialogs = ScriptedDialogs::default();

        let out = run_line(&settings, &mut dialogs, "list").await.unwrap();
        assert!(out.contains("No todos yet"));
        assert_eq!(dialogs.alerts, [todolist_core::controller::LOAD_FAILED]);
    }

    #[tokio::test]
    async fn torn_session_file_does_not_block_commands() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir).await;
        std::fs::write(&settings.session_file, r#"{"sb-local-auth-tok"#).unwrap();
        let mut dialogs = ScriptedDialogs::default();

        let out = run_line(&settings, &mut dialogs, "list").await.unwrap();
        assert!(out.contains("No todos yet"));
        run_line(&settings, &mut dialogs, "logout").await.unwrap();
        assert!(dialogs.alerts.is_empty());
    }

    #[tokio::test]
    async fn login_and_logout_manage_the_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir).await;
        let mut dialogs = ScriptedDialogs::default();

        let out = run_line(&settings, &mut dialogs, "login abc.def").await.unwrap();
        assert_eq!(out, "Signed in to local\n");
        let stored = settings.sessions().load(Utc::now()).unwrap().unwrap();
        assert_eq!(stored.access_token, "abc.def");

        // The stored token rides along as the bearer; the backend accepts it.
        run_line(&settings, &mut dialogs, "add Buy milk").await.unwrap();

        run_line(&settings, &mut dialogs, "logout").await.unwrap();
        assert!(settings.sessions().load(Utc::now()).unwrap().is_none());
    }
}
