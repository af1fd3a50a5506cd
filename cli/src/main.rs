mod app;
mod command;
mod dialogs;
mod render;

use std::io::IsTerminal;
use std::process::ExitCode;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::app::{AppError, Settings};
use crate::command::{Command, USAGE};
use crate::dialogs::{Dialogs, HeadlessDialogs, TerminalDialogs};

const ASSUME_YES_VAR: &str = "TODO_ASSUME_YES";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todolist=warn,todolist_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = match command::parse(std::env::args().skip(1)) {
        Ok(Command::Help) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Ok(command) => command,
        Err(e) => {
            eprintln!("todolist: {e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let mut dialogs: Box<dyn Dialogs> = if std::io::stdin().is_terminal() {
        Box::new(TerminalDialogs::new(
            std::io::stdin().lock(),
            std::io::stdout(),
        ))
    } else {
        Box::new(HeadlessDialogs::new(
            std::env::var_os(ASSUME_YES_VAR).is_some(),
        ))
    };

    let result = match Settings::from_env() {
        Ok(settings) => app::run(command, &settings, dialogs.as_mut()).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(AppError::Reported) => ExitCode::FAILURE,
        Err(e) => {
            dialogs.alert("Error", &e.to_string());
            ExitCode::FAILURE
        }
    }
}
