//! Operator shell: line commands against the live registry.
//!
//! Commands are tokenized into verb and arguments, argument shape is
//! validated, and only then is a store operation dispatched. Malformed input
//! gets a usage message and never touches the store.
//!
//! Accepted grammar:
//!
//! ```text
//! clients list            print every live (identity, origin) pair
//! client <identity> remove  drop one registration
//! help [<topic>]          placeholder
//! ```

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::registry::{ClientStore, IDENTITY_LEN, RemoveOutcome};

/// A fully validated operator command, ready to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListClients,
    RemoveClient(String),
    Help,
}

/// Why a line did not parse into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    MissingAction { topic: &'static str },
    MissingArguments,
    UnknownAction { topic: &'static str, action: String },
    IdentityTooShort,
    IdentityTooLong,
    IdentityInvalid,
    /// Empty line, unknown verb, or trailing junk. Ignored without output.
    Unrecognized,
}

fn validate_identity(identity: &str) -> Result<(), CommandError> {
    if !identity.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CommandError::IdentityInvalid);
    }
    match identity.len().cmp(&IDENTITY_LEN) {
        std::cmp::Ordering::Less => Err(CommandError::IdentityTooShort),
        std::cmp::Ordering::Greater => Err(CommandError::IdentityTooLong),
        std::cmp::Ordering::Equal => Ok(()),
    }
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut tokens = line.split_whitespace();
    let Some(verb) = tokens.next() else {
        return Err(CommandError::Unrecognized);
    };

    match verb {
        "clients" => {
            let action = tokens.next();
            if tokens.next().is_some() {
                return Err(CommandError::Unrecognized);
            }
            match action {
                None => Err(CommandError::MissingAction { topic: "clients" }),
                Some("list") => Ok(Command::ListClients),
                Some(other) => Err(CommandError::UnknownAction {
                    topic: "clients",
                    action: other.to_string(),
                }),
            }
        }
        "client" => {
            let identity = tokens.next();
            let action = tokens.next();
            if tokens.next().is_some() {
                return Err(CommandError::Unrecognized);
            }
            let Some(identity) = identity else {
                return Err(CommandError::MissingArguments);
            };
            validate_identity(identity)?;
            match action {
                None => Err(CommandError::MissingAction { topic: "client" }),
                Some("remove") => Ok(Command::RemoveClient(identity.to_string())),
                Some(other) => Err(CommandError::UnknownAction {
                    topic: "client",
                    action: other.to_string(),
                }),
            }
        }
        "help" => {
            tokens.next();
            if tokens.next().is_some() {
                return Err(CommandError::Unrecognized);
            }
            Ok(Command::Help)
        }
        _ => Err(CommandError::Unrecognized),
    }
}

/// Usage message for a parse error, or `None` when the line should be
/// silently ignored.
#[must_use]
pub fn describe_error(err: &CommandError) -> Option<String> {
    match err {
        CommandError::MissingAction { topic } => {
            Some(format!("Missing action\nType 'help {topic}' for usage"))
        }
        CommandError::MissingArguments => {
            Some("Missing arguments\nType 'help client' for usage".to_string())
        }
        CommandError::UnknownAction { topic, action } => Some(format!(
            "Unknown action: {action}\nType 'help {topic}' for usage"
        )),
        CommandError::IdentityTooShort => {
            Some("ID too short\nType 'help client' for usage".to_string())
        }
        CommandError::IdentityTooLong => {
            Some("ID too long\nType 'help client' for usage".to_string())
        }
        CommandError::IdentityInvalid => Some(format!(
            "ID must be {IDENTITY_LEN} alphanumeric characters\nType 'help client' for usage"
        )),
        CommandError::Unrecognized => None,
    }
}

/// Run a command against the store and return the reply text.
pub fn execute(command: &Command, store: &ClientStore) -> String {
    match command {
        Command::ListClients => {
            let mut lines = vec!["Active clients:".to_string()];
            for (identity, origin) in store.list() {
                lines.push(format!("ID: {identity}, IP: {origin}"));
            }
            lines.join("\n")
        }
        Command::RemoveClient(identity) => match store.remove(identity) {
            RemoveOutcome::Removed => format!("Client with ID {identity} removed"),
            RemoveOutcome::NotFound => {
                format!("Client with ID {identity} not found\nType 'help client' for usage")
            }
        },
        Command::Help => "Not implemented yet".to_string(),
    }
}

/// Read operator commands from stdin until the shutdown channel fires or
/// stdin closes.
pub async fn run_shell(store: Arc<ClientStore>, mut shutdown: watch::Receiver<bool>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(command) => println!("{}", execute(&command, &store)),
                    Err(err) => {
                        if let Some(message) = describe_error(&err) {
                            println!("{message}");
                        }
                    }
                },
                Ok(None) => {
                    debug!("stdin closed, operator shell exiting");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "failed to read operator command");
                    break;
                }
            },
        }
    }
}
