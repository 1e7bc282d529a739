//! Global configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

fn default_listener_cmd() -> String {
    "nc".into()
}

fn default_listener_args() -> Vec<String> {
    vec!["-l".into(), "-p".into(), "{port}".into()]
}

fn default_response_window_ms() -> u64 {
    500
}

fn default_stop_grace_ms() -> u64 {
    3000
}

fn default_queue_capacity() -> usize {
    1024
}

/// Global configuration parsed from an optional `config.toml`.
///
/// Every field has a default, so an absent or empty file yields a working
/// configuration that spawns plain `nc -l -p <port>` listeners.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct GlobalConfig {
    /// Listener binary spawned for each session.
    pub listener_cmd: String,
    /// Argument template for the listener; every `{port}` occurrence is
    /// replaced with the session's port number at spawn time.
    pub listener_args: Vec<String>,
    /// How long `send` waits for the first response line before draining.
    pub response_window_ms: u64,
    /// Grace period between SIGTERM and force-kill when stopping a session.
    pub stop_grace_ms: u64,
    /// Per-stream capacity of the captured-line queues; the oldest line is
    /// dropped on overflow.
    pub queue_capacity: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            listener_cmd: default_listener_cmd(),
            listener_args: default_listener_args(),
            response_window_ms: default_response_window_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl GlobalConfig {
    /// Parse a configuration from TOML text and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the TOML is malformed or a field
    /// fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("cannot read {}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Deadline for `send`'s best-effort response wait.
    #[must_use]
    pub fn response_window(&self) -> Duration {
        Duration::from_millis(self.response_window_ms)
    }

    /// Grace period before a stubborn listener process is force-killed.
    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// Argument vector for a listener bound to `port`.
    #[must_use]
    pub fn listener_args_for(&self, port: u16) -> Vec<String> {
        let port_text = port.to_string();
        self.listener_args
            .iter()
            .map(|arg| arg.replace("{port}", &port_text))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.listener_cmd.trim().is_empty() {
            return Err(AppError::Config("listener_cmd must not be empty".into()));
        }
        if self.queue_capacity == 0 {
            return Err(AppError::Config("queue_capacity must be at least 1".into()));
        }
        Ok(())
    }
}
