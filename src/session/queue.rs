//! Per-stream captured-line queue.
//!
//! One producer (a capture task) and one consumer (the control path) share
//! each queue. The queue is bounded: on overflow the oldest line is dropped
//! so a chatty peer cannot grow memory without bound. Reads are full
//! drains — a drain removes and returns everything currently queued.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::debug;

/// Bounded FIFO of captured output lines with an arrival notification.
///
/// Cloning is cheap and shares the underlying queue; the capture task holds
/// one clone as the producer handle.
#[derive(Debug, Clone)]
pub struct OutputQueue {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    lines: Mutex<VecDeque<String>>,
    notify: Notify,
    capacity: usize,
}

impl OutputQueue {
    /// Create a queue holding at most `capacity` lines.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                lines: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
                notify: Notify::new(),
                capacity,
            }),
        }
    }

    /// Append a line, dropping the oldest queued line on overflow, and
    /// signal any waiting consumer.
    pub async fn push(&self, line: String) {
        {
            let mut lines = self.inner.lines.lock().await;
            if lines.len() >= self.inner.capacity {
                lines.pop_front();
                debug!(capacity = self.inner.capacity, "output queue full, dropping oldest line");
            }
            lines.push_back(line);
        }
        self.inner.notify.notify_one();
    }

    /// Remove and return every queued line, leaving the queue empty.
    pub async fn drain(&self) -> Vec<String> {
        let mut lines = self.inner.lines.lock().await;
        lines.drain(..).collect()
    }

    /// Whether the queue currently holds no lines.
    pub async fn is_empty(&self) -> bool {
        self.inner.lines.lock().await.is_empty()
    }

    /// Wait up to `window` for at least one line to be available.
    ///
    /// Returns `true` when a line is (or becomes) available within the
    /// window, `false` only when the deadline expires with the queue still
    /// empty. This is a best-effort signal for the synchronous-looking
    /// send/response path; a `false` here only means the peer was slow,
    /// and a later [`drain`](Self::drain) will still pick the output up.
    pub async fn wait_for_line(&self, window: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            // Register for the arrival signal before checking emptiness so
            // a push between the check and the wait is not missed.
            let notified = self.inner.notify.notified();
            if !self.is_empty().await {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return !self.is_empty().await;
            }
            // Woken by a push, or by a permit stored while nobody was
            // waiting. Only the queue's contents decide, so a stale permit
            // costs one lap of the loop, not the rest of the window.
        }
    }
}
