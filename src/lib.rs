#![forbid(unsafe_code)]

//! Library crate behind the `juggler` binary: configuration, operator
//! command parsing, and the listener session manager.

pub mod command;
pub mod config;
pub mod errors;
pub mod session;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
