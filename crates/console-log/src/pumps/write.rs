//! Outbound half: serialises CDP commands onto the socket.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

/// Forwards queued frames to the socket until cancelled, the queue closes
/// or a send fails, then sends a close frame.
pub(crate) async fn write_pump<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = outbound.recv() => frame,
        };
        let Some(frame) = frame else { break };
        if let Err(e) = sink.send(frame).await {
            tracing::warn!(error = %e, "CDP write failed");
            cancel.cancel();
            break;
        }
    }

    let _ = sink.send(tungstenite::Message::Close(None)).await;
}
