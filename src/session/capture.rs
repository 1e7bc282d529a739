//! Output capture tasks.
//!
//! Each session runs one capture task per output stream (stdout, stderr).
//! A task loops over a buffered line read racing the session's cancellation
//! token and enqueues every line it receives. It exits on cancellation, on
//! EOF (the peer closed the stream), or on a read error. Because the read
//! itself races the token inside `select!`, `stop()` never strands a task
//! on a stream that refuses to close.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session::OutputQueue;

/// Spawn the capture task for one output stream of a listener process.
///
/// `stream` is a label (`"stdout"` / `"stderr"`) used only for logging.
/// Lines are enqueued without their trailing newline. Dropping the returned
/// handle detaches the task; `Session::stop` joins it under a bound.
#[must_use]
pub fn spawn_capture<R>(
    port: u16,
    stream: &'static str,
    reader: R,
    queue: OutputQueue,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!(port, stream, "capture task cancelled");
                    break;
                }

                line = lines.next_line() => match line {
                    Ok(Some(line)) => queue.push(line).await,
                    Ok(None) => {
                        debug!(port, stream, "capture task reached EOF");
                        break;
                    }
                    Err(err) => {
                        warn!(port, stream, %err, "capture task read error, stopping");
                        break;
                    }
                },
            }
        }
    })
}
