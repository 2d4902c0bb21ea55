//! Console commands
//! This module defines the commands the operator can type, and runs them
//! against the application state.

use thiserror::Error;

use crate::core::driver::UserIntent;
use crate::core::error::SessionError;
use crate::state::AppState;

pub const HELP: &str = "\
Commands:
  connect          scan for the Locker and connect
  disconnect       close the connection
  unlock <code>    unlock with an access code
  lock <code>      lock with an access code
  update           provision new access codes
  ready            tell the Locker the app is ready
  reset            reset the Locker
  status           show connection and lock state
  help             show this text
  quit             exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Intent(UserIntent),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command `{0}`, type `help` for a list")]
    Unknown(String),
    #[error("`{command}` takes no arguments")]
    UnexpectedArgument { command: String },
    #[error("`{0}` takes a single access code")]
    TooManyArguments(String),
}

/// What the console should do after a command ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Done,
    Text(String),
    Quit,
}

/// Parses one input line. Blank lines parse to `None`.
///
/// `unlock`/`lock` without a code parse to an empty code so the session
/// can reject it like any other invalid input.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();
    let command = head.to_ascii_lowercase();

    let code_arg = |args: &[&str]| -> Result<String, ParseError> {
        match args {
            [] => Ok(String::new()),
            [code] => Ok(code.to_string()),
            _ => Err(ParseError::TooManyArguments(command.clone())),
        }
    };

    let parsed = match command.as_str() {
        "unlock" => ConsoleCommand::Intent(UserIntent::Unlock(code_arg(&args)?)),
        "lock" => ConsoleCommand::Intent(UserIntent::Lock(code_arg(&args)?)),
        other => {
            if !args.is_empty() {
                return Err(ParseError::UnexpectedArgument {
                    command: other.to_string(),
                });
            }
            match other {
                "connect" => ConsoleCommand::Intent(UserIntent::Connect),
                "disconnect" => ConsoleCommand::Intent(UserIntent::Disconnect),
                "update" => ConsoleCommand::Intent(UserIntent::UpdateCodes),
                "ready" => ConsoleCommand::Intent(UserIntent::AppReady),
                "reset" => ConsoleCommand::Intent(UserIntent::Reset),
                "status" => ConsoleCommand::Status,
                "help" | "?" => ConsoleCommand::Help,
                "quit" | "exit" => ConsoleCommand::Quit,
                _ => return Err(ParseError::Unknown(head.to_string())),
            }
        }
    };
    Ok(Some(parsed))
}

/// Runs a parsed command.
///
/// Intent failures have already been reported through the presentation
/// sink; the returned error is for logging.
pub async fn run_command(app_state: &AppState, command: ConsoleCommand) -> Result<Reply, SessionError> {
    match command {
        ConsoleCommand::Intent(intent) => {
            app_state.session.submit(intent).await?;
            Ok(Reply::Done)
        }
        ConsoleCommand::Status => {
            let snapshot = app_state.session.snapshot().await?;
            let mut text = format!(
                "Connection : {}, Lock status : {}",
                snapshot.connection, snapshot.lock
            );
            if let Some(kind) = snapshot.pending {
                text.push_str(&format!(", waiting on {:?}", kind));
            }
            if let Some(device) = app_state.bluetooth_manager.last_found().await {
                text.push_str(&format!(", device {} ({})", device.name, device.id));
            }
            Ok(Reply::Text(text))
        }
        ConsoleCommand::Help => Ok(Reply::Text(HELP.to_string())),
        ConsoleCommand::Quit => Ok(Reply::Quit),
    }
}
