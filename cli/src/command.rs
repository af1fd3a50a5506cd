//! Command-line arguments.

use thiserror::Error;
use todolist_core::{Todo, TodoId};

pub const USAGE: &str = "\
usage: todolist [command]

commands:
  list                 show all todos (default)
  add <task...>        add a todo
  toggle <ref>         flip a todo between done and not done
  edit <ref> [text...] change a todo's text (prompts when text is omitted)
  rm <ref>             delete a todo
  login <token>        store a session token for the backend
  logout               forget the stored session token
  help                 show this message

<ref> is a todo id or #N for the N-th todo in the list.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Add(String),
    Toggle(ItemRef),
    Edit { target: ItemRef, text: Option<String> },
    Remove(ItemRef),
    Login(String),
    Logout,
    Help,
}

/// How the user points at a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRef {
    Id(TodoId),
    /// 1-based position in the displayed list.
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("`{0}` needs {1}")]
    MissingArgument(&'static str, &'static str),

    #[error("invalid position {0:?}")]
    InvalidPosition(String),
}

impl ItemRef {
    pub fn parse(raw: &str) -> Result<Self, UsageError> {
        match raw.strip_prefix('#') {
            Some(n) => match n.parse::<usize>() {
                Ok(position) if position > 0 => Ok(Self::Position(position)),
                _ => Err(UsageError::InvalidPosition(raw.to_string())),
            },
            None => Ok(Self::Id(TodoId::from(raw))),
        }
    }

    pub fn resolve<'a>(&self, items: &'a [Todo]) -> Option<&'a Todo> {
        match self {
            Self::Id(id) => items.iter().find(|todo| &todo.id == id),
            Self::Position(position) => position.checked_sub(1).and_then(|i| items.get(i)),
        }
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Position(position) => write!(f, "#{position}"),
        }
    }
}

pub fn parse<I>(args: I) -> Result<Command, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(name) = args.next() else {
        return Ok(Command::List);
    };
    let rest: Vec<String> = args.collect();

    let target = |command: &'static str| -> Result<ItemRef, UsageError> {
        let raw = rest
            .first()
            .ok_or(UsageError::MissingArgument(command, "a todo id or #N"))?;
        ItemRef::parse(raw)
    };

    match name.as_str() {
        "list" | "ls" => Ok(Command::List),
        "add" => Ok(Command::Add(rest.join(" "))),
        "toggle" | "done" => Ok(Command::Toggle(target("toggle")?)),
        "edit" => {
            let target = target("edit")?;
            let text = (rest.len() > 1).then(|| rest[1..].join(" "));
            Ok(Command::Edit { target, text })
        }
        "rm" | "delete" => Ok(Command::Remove(target("rm")?)),
        "login" => rest
            .first()
            .cloned()
            .map(Command::Login)
            .ok_or(UsageError::MissingArgument("login", "a token")),
        "logout" => Ok(Command::Logout),
        "help" | "-h" | "--help" => Ok(Command::Help),
        other => Err(UsageError::UnknownCommand(other.to_string())),
    }
}
