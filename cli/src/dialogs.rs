//! Alert, confirm and text-prompt capability.
//!
//! The app picks an implementation once at startup; nothing downstream
//! checks what kind of terminal it is running in.

use std::io::{BufRead, Write};

use tracing::warn;

pub trait Dialogs {
    fn alert(&mut self, title: &str, message: &str);

    fn confirm(&mut self, title: &str, message: &str) -> bool;

    /// `None` when the user cancels.
    fn request_text(&mut self, title: &str, message: &str, initial: &str) -> Option<String>;
}

/// Interactive prompts on a reader/writer pair, normally stdin/stdout.
pub struct TerminalDialogs<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalDialogs<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Option<String> {
        if let Err(e) = write!(self.output, "{prompt}").and_then(|()| self.output.flush()) {
            warn!(error = %e, "failed to write prompt");
        }
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                warn!(error = %e, "failed to read answer");
                None
            }
        }
    }
}

impl<R: BufRead, W: Write> Dialogs for TerminalDialogs<R, W> {
    fn alert(&mut self, title: &str, message: &str) {
        if let Err(e) = writeln!(self.output, "{title}: {message}") {
            warn!(error = %e, "failed to write alert");
        }
    }

    fn confirm(&mut self, title: &str, message: &str) -> bool {
        self.ask(&format!("{title}\n{message} [y/N] "))
            .is_some_and(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    /// An empty answer keeps `initial`; end of input cancels.
    fn request_text(&mut self, title: &str, message: &str, initial: &str) -> Option<String> {
        let answer = self.ask(&format!("{title}\n{message} [{initial}] "))?;
        if answer.is_empty() {
            Some(initial.to_string())
        } else {
            Some(answer)
        }
    }
}

/// For pipes and scripts: alerts go to stderr, confirmations get a fixed
/// answer and text prompts are cancelled.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessDialogs {
    assume_yes: bool,
}

impl HeadlessDialogs {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Dialogs for HeadlessDialogs {
    fn alert(&mut self, title: &str, message: &str) {
        eprintln!("{title}: {message}");
    }

    fn confirm(&mut self, _title: &str, _message: &str) -> bool {
        self.assume_yes
    }

    fn request_text(&mut self, _title: &str, _message: &str, _initial: &str) -> Option<String> {
        None
    }
}
