//! A single listener session.
//!
//! A [`Session`] owns one spawned listener process, the write half of its
//! stdin, and a bounded captured-line queue per output stream, each fed by
//! a background capture task. The child is spawned with
//! `kill_on_drop(true)` so an abandoned session cannot leak a process.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::session::{capture, OutputQueue};
use crate::{AppError, Result};

/// Bound on how long `stop` waits for each capture task after the process
/// has exited; a task still running past this is aborted.
const CAPTURE_JOIN_GRACE: Duration = Duration::from_secs(2);

/// One managed listener process bound to a port, plus its capture queues.
#[derive(Debug)]
pub struct Session {
    port: u16,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout_queue: OutputQueue,
    stderr_queue: OutputQueue,
    cancel: CancellationToken,
    capture_tasks: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl Session {
    /// Spawn the external listener bound to `port` and start both capture
    /// tasks.
    ///
    /// The command line comes from the configuration: `listener_cmd` plus
    /// `listener_args` with `{port}` substituted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Spawn` when the listener binary is unavailable or
    /// the spawn fails, or when a stdio handle cannot be captured. No
    /// process is left running on failure.
    pub fn spawn(port: u16, config: &GlobalConfig) -> Result<Self> {
        let args = config.listener_args_for(port);

        let mut child = Command::new(&config.listener_cmd)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                AppError::Spawn(format!(
                    "failed to start `{}` for port {port}: {err}",
                    config.listener_cmd
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Spawn("failed to capture listener stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Spawn("failed to capture listener stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Spawn("failed to capture listener stderr".into()))?;

        info!(
            port,
            pid = child.id().unwrap_or(0),
            cmd = %config.listener_cmd,
            "listener started"
        );

        let stdout_queue = OutputQueue::new(config.queue_capacity);
        let stderr_queue = OutputQueue::new(config.queue_capacity);
        let cancel = CancellationToken::new();

        let capture_tasks = vec![
            capture::spawn_capture(
                port,
                "stdout",
                stdout,
                stdout_queue.clone(),
                cancel.child_token(),
            ),
            capture::spawn_capture(
                port,
                "stderr",
                stderr,
                stderr_queue.clone(),
                cancel.child_token(),
            ),
        ];

        Ok(Self {
            port,
            child,
            stdin: Some(stdin),
            stdout_queue,
            stderr_queue,
            cancel,
            capture_tasks,
            stopped: false,
        })
    }

    /// Port this session's listener is bound to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Write `data` plus a newline to the listener's stdin and flush.
    ///
    /// The write goes straight into the OS pipe; a full pipe blocks the
    /// call until the peer drains it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` when the session has been stopped or the
    /// write fails (for instance because the process exited).
    pub async fn send(&mut self, data: &str) -> Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(AppError::Io(format!(
                "listener on port {} is not running",
                self.port
            )));
        };
        stdin.write_all(data.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Snapshot read: drain everything queued on stdout, joined with
    /// newlines and trimmed of trailing whitespace.
    ///
    /// Never waits for more data; returns an empty string when nothing is
    /// queued. The drain is destructive — a second call with no new output
    /// in between returns empty.
    pub async fn receive(&self) -> String {
        let lines = self.stdout_queue.drain().await;
        lines.join("\n").trim_end().to_owned()
    }

    /// Wait up to `window` for the first response line, then snapshot.
    ///
    /// Best effort: a peer slower than the window produces an empty result
    /// here, and its late output is picked up by the next
    /// [`receive`](Self::receive) call.
    pub async fn receive_within(&self, window: Duration) -> String {
        self.stdout_queue.wait_for_line(window).await;
        self.receive().await
    }

    /// Snapshot drain of the stderr queue, one diagnostic line per entry.
    pub async fn drain_stderr(&self) -> Vec<String> {
        self.stderr_queue.drain().await
    }

    /// Whether the listener process is still alive.
    pub fn is_running(&mut self) -> bool {
        !self.stopped && matches!(self.child.try_wait(), Ok(None))
    }

    /// Stop the session: cancel the capture tasks, terminate the process,
    /// await its exit, and join the capture tasks under a bound.
    ///
    /// The process receives SIGTERM first and is force-killed only after
    /// `grace` elapses. A capture task that outlives [`CAPTURE_JOIN_GRACE`]
    /// is aborted rather than abandoned. Returns `false` (and does nothing)
    /// when the session was already stopped.
    pub async fn stop(&mut self, grace: Duration) -> bool {
        if self.stopped {
            info!(port = self.port, "listener already stopped");
            return false;
        }
        self.stopped = true;
        let port = self.port;

        info!(port, "stopping listener");
        self.cancel.cancel();
        // Closing stdin gives the peer an EOF before the signal lands.
        self.stdin = None;

        signal_terminate(&mut self.child, port);

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => info!(port, %status, "listener exited"),
            Ok(Err(err)) => warn!(port, %err, "error waiting for listener exit"),
            Err(_) => {
                warn!(port, "listener ignored SIGTERM, force-killing");
                if let Err(err) = self.child.kill().await {
                    warn!(port, %err, "failed to force-kill listener");
                }
            }
        }

        for mut task in self.capture_tasks.drain(..) {
            match tokio::time::timeout(CAPTURE_JOIN_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(port, %err, "capture task failed"),
                Err(_) => {
                    warn!(port, "capture task did not finish in time, aborting");
                    task.abort();
                }
            }
        }

        info!(port, "listener stopped");
        true
    }
}

#[cfg(unix)]
fn signal_terminate(child: &mut Child, port: u16) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        // Process already reaped.
        return;
    };
    match i32::try_from(pid) {
        Ok(raw) => {
            if let Err(err) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
                warn!(port, %err, "failed to signal listener");
            }
        }
        Err(_) => warn!(port, pid, "listener pid out of range for signalling"),
    }
}

#[cfg(not(unix))]
fn signal_terminate(child: &mut Child, port: u16) {
    if let Err(err) = child.start_kill() {
        warn!(port, %err, "failed to kill listener");
    }
}
