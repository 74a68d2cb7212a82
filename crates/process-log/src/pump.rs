//! Async pumps that stream child output to a line callback.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::lines::LineSplitter;
use crate::{OutputStream, ProcessLine};

/// Callback invoked with every line the child writes.
pub type OnLineFn = Arc<dyn Fn(ProcessLine) + Send + Sync + 'static>;

/// Read buffer size per pump.
const CHUNK_SIZE: usize = 8 * 1024;

/// Reads `reader` to EOF, emitting each complete line.
///
/// A trailing unterminated line is flushed at EOF. Cancellation stops
/// reading without flushing. Returns the number of lines emitted.
pub async fn pump_lines<R>(
    mut reader: R,
    stream: OutputStream,
    on_line: OnLineFn,
    cancel: CancellationToken,
) -> u64
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut count = 0u64;

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => return count,
            read = reader.read(&mut buf) => read,
        };
        match read {
            Ok(0) => break,
            Ok(n) => {
                for text in splitter.push(&buf[..n]) {
                    on_line(ProcessLine { stream, text });
                    count += 1;
                }
            }
            Err(e) => {
                tracing::warn!(?stream, error = %e, "error reading child output");
                break;
            }
        }
    }

    if let Some(text) = splitter.finish() {
        on_line(ProcessLine { stream, text });
        count += 1;
    }
    tracing::debug!(?stream, lines = count, "child output closed");
    count
}

/// Running stdout/stderr pumps of one child.
pub struct OutputPumps {
    handles: Vec<JoinHandle<u64>>,
}

impl OutputPumps {
    pub(crate) fn new(handles: Vec<JoinHandle<u64>>) -> Self {
        Self { handles }
    }

    /// Waits until every pipe reached EOF or was cancelled. Returns the
    /// total number of lines emitted.
    pub async fn join(self) -> u64 {
        let mut total = 0;
        for handle in self.handles {
            match handle.await {
                Ok(n) => total += n,
                Err(e) => tracing::warn!(error = %e, "output pump task failed"),
            }
        }
        total
    }
}
