//! Operator command parsing.
//!
//! Maps one line of operator input onto exactly one registry operation.
//! Parsing is intentionally forgiving about surrounding whitespace and
//! strict about everything else: an unknown verb or a malformed port is a
//! `Parse` error that the control loop reports and ignores.

use crate::{AppError, Result};

/// A parsed operator command, one variant per registry operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a new listener on the given port.
    Add(u16),
    /// Stop and remove the listener on the given port.
    Remove(u16),
    /// List all active listener ports.
    List,
    /// Select the listener to interact with.
    Select(u16),
    /// Send a line of text to the selected listener.
    Send(String),
    /// Stop every listener and exit.
    Stop,
    /// Print the help text.
    Help,
}

impl Command {
    /// Parse a line of operator input.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Parse` for an empty line, an unknown verb, a
    /// missing argument, or a port that is not a valid `u16`.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (verb, rest) = match input.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (input, ""),
        };

        match verb {
            "add" => Ok(Self::Add(parse_port(rest)?)),
            "remove" => Ok(Self::Remove(parse_port(rest)?)),
            "select" => Ok(Self::Select(parse_port(rest)?)),
            "list" => reject_trailing(rest, Self::List),
            "stop" => reject_trailing(rest, Self::Stop),
            "help" => reject_trailing(rest, Self::Help),
            "send" => {
                if rest.is_empty() {
                    Err(AppError::Parse("send requires a command to transmit".into()))
                } else {
                    Ok(Self::Send(rest.to_owned()))
                }
            }
            "" => Err(AppError::Parse("empty command".into())),
            other => Err(AppError::Parse(format!("unknown command `{other}`"))),
        }
    }
}

fn parse_port(text: &str) -> Result<u16> {
    if text.is_empty() {
        return Err(AppError::Parse("expected a port number".into()));
    }
    text.parse::<u16>()
        .map_err(|_| AppError::Parse(format!("`{text}` is not a valid port")))
}

fn reject_trailing(rest: &str, command: Command) -> Result<Command> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(AppError::Parse(format!(
            "unexpected trailing input `{rest}`"
        )))
    }
}
