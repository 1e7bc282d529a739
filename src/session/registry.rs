//! Port-keyed session registry and selection state.
//!
//! The registry exclusively owns every [`Session`] and the "selected"
//! pointer the operator interacts through. It is single-owner state: all
//! mutation happens from the control task, so the map itself needs no
//! locking — the only cross-task sharing is inside each session's queues.
//!
//! Invariant: `selected`, when set, is always a key of `sessions`; removing
//! the selected session clears the selection.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::session::Session;
use crate::{AppError, Result};

/// Owner of all listener sessions, keyed by port.
#[derive(Debug)]
pub struct SessionRegistry {
    config: Arc<GlobalConfig>,
    sessions: BTreeMap<u16, Session>,
    selected: Option<u16>,
}

impl SessionRegistry {
    /// Create an empty registry spawning sessions per `config`.
    #[must_use]
    pub fn new(config: Arc<GlobalConfig>) -> Self {
        Self {
            config,
            sessions: BTreeMap::new(),
            selected: None,
        }
    }

    /// Start a new listener session on `port` and register it.
    ///
    /// A port whose previous session's process has already exited is
    /// treated as free: the stale entry is evicted before the new listener
    /// is spawned.
    ///
    /// # Errors
    ///
    /// - `AppError::DuplicateSession` when a live session already occupies
    ///   the port; the registry is unchanged.
    /// - `AppError::Spawn` when the listener cannot be started. No new
    ///   session is registered, but a stale eviction that preceded the
    ///   failed spawn is not rolled back: the dead entry stays gone and a
    ///   selection that pointed at it stays cleared.
    pub async fn add(&mut self, port: u16) -> Result<()> {
        if let Some(existing) = self.sessions.get_mut(&port) {
            if existing.is_running() {
                return Err(AppError::DuplicateSession(port));
            }
            warn!(port, "evicting stale session whose listener already exited");
            existing.stop(self.config.stop_grace()).await;
            self.sessions.remove(&port);
            if self.selected == Some(port) {
                self.selected = None;
            }
        }

        let session = Session::spawn(port, &self.config)?;
        self.sessions.insert(port, session);
        Ok(())
    }

    /// Stop and deregister the session on `port`.
    ///
    /// Clears the selection when it pointed at the removed session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UnknownSession` when no session is keyed by
    /// `port`; the registry is unchanged.
    pub async fn remove(&mut self, port: u16) -> Result<()> {
        let Some(mut session) = self.sessions.remove(&port) else {
            return Err(AppError::UnknownSession(port));
        };
        session.stop(self.config.stop_grace()).await;
        if self.selected == Some(port) {
            self.selected = None;
            info!(port, "selection cleared, its session was removed");
        }
        Ok(())
    }

    /// Active ports, in ascending (stable) order.
    #[must_use]
    pub fn list(&self) -> Vec<u16> {
        self.sessions.keys().copied().collect()
    }

    /// Designate the session commands are exchanged with.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UnknownSession` when no session is keyed by
    /// `port`; the current selection is left unchanged.
    pub fn select(&mut self, port: u16) -> Result<()> {
        if !self.sessions.contains_key(&port) {
            return Err(AppError::UnknownSession(port));
        }
        self.selected = Some(port);
        info!(port, "session selected");
        Ok(())
    }

    /// Currently selected port, if any.
    #[must_use]
    pub fn selected(&self) -> Option<u16> {
        self.selected
    }

    /// Forward `text` to the selected session and return the response
    /// captured within the configured window.
    ///
    /// Best effort: a peer slower than the window yields an empty snapshot
    /// here; its late output is surfaced by a later
    /// [`drain_selected`](Self::drain_selected).
    ///
    /// # Errors
    ///
    /// - `AppError::NoSelection` when nothing is selected.
    /// - `AppError::Io` when the write to the listener fails.
    pub async fn send_command(&mut self, text: &str) -> Result<String> {
        let port = self.selected.ok_or(AppError::NoSelection)?;
        let window = self.config.response_window();
        // The invariant guarantees the lookup succeeds while selected is set.
        let session = self.sessions.get_mut(&port).ok_or(AppError::NoSelection)?;
        session.send(text).await?;
        Ok(session.receive_within(window).await)
    }

    /// Snapshot read of any output queued on the selected session.
    ///
    /// Returns `None` when nothing is selected or nothing is queued.
    pub async fn drain_selected(&self) -> Option<(u16, String)> {
        let port = self.selected?;
        let session = self.sessions.get(&port)?;
        let output = session.receive().await;
        if output.is_empty() {
            None
        } else {
            Some((port, output))
        }
    }

    /// Snapshot read of any stderr diagnostics queued on the selected
    /// session.
    pub async fn drain_selected_stderr(&self) -> Option<(u16, Vec<String>)> {
        let port = self.selected?;
        let session = self.sessions.get(&port)?;
        let lines = session.drain_stderr().await;
        if lines.is_empty() {
            None
        } else {
            Some((port, lines))
        }
    }

    /// Stop every session and clear the registry. Idempotent.
    pub async fn stop_all(&mut self) {
        if self.sessions.is_empty() {
            self.selected = None;
            return;
        }
        info!(count = self.sessions.len(), "stopping all listeners");
        while let Some((_, mut session)) = self.sessions.pop_first() {
            session.stop(self.config.stop_grace()).await;
        }
        self.selected = None;
    }
}
