//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
///
/// Registry-level failures (`DuplicateSession`, `UnknownSession`,
/// `NoSelection`) are reported to the operator and skipped; none of them is
/// fatal to the control loop.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// External listener process could not be started.
    Spawn(String),
    /// `add` targeted a port that already has a live session.
    DuplicateSession(u16),
    /// `remove` or `select` targeted a port with no session.
    UnknownSession(u16),
    /// `send` was issued with no session selected.
    NoSelection,
    /// Operator input could not be parsed into a command.
    Parse(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::DuplicateSession(port) => {
                write!(f, "a listener on port {port} already exists")
            }
            Self::UnknownSession(port) => write!(f, "no listener on port {port}"),
            Self::NoSelection => write!(f, "no connection selected"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
