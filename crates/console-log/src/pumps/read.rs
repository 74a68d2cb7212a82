//! Inbound half: routes command responses and forwards notifications.

use devtap_protocol::cdp::CdpIncoming;
use devtap_protocol::constants::WS_MAX_MESSAGE_SIZE;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{CdpEventFrame, PendingMap};

/// Reads frames until the socket closes, fails or `cancel` fires.
///
/// Responses are matched to pending commands by id; notifications go to
/// `events`. On exit the session is cancelled and every pending command
/// observes a closed channel.
pub(crate) async fn read_pump<S>(
    mut stream: S,
    pending: PendingMap,
    events: mpsc::UnboundedSender<CdpEventFrame>,
    outbound: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = stream.next() => frame,
        };
        match frame {
            Some(Ok(tungstenite::Message::Text(text))) => {
                if !dispatch(&text, &pending, &events).await {
                    debug!("event receiver dropped");
                    break;
                }
            }
            Some(Ok(tungstenite::Message::Ping(data))) => {
                let _ = outbound.send(tungstenite::Message::Pong(data)).await;
            }
            Some(Ok(tungstenite::Message::Close(frame))) => {
                debug!(?frame, "CDP socket closed by browser");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "CDP read failed");
                break;
            }
            None => {
                debug!("CDP stream ended");
                break;
            }
        }
    }

    cancel.cancel();
    pending.lock().await.clear();
}

/// Handles one text frame. Returns `false` once nobody listens for events.
async fn dispatch(
    text: &str,
    pending: &PendingMap,
    events: &mpsc::UnboundedSender<CdpEventFrame>,
) -> bool {
    if text.len() > WS_MAX_MESSAGE_SIZE {
        warn!(len = text.len(), "oversized CDP frame dropped");
        return true;
    }
    let incoming: CdpIncoming = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "unparseable CDP frame");
            return true;
        }
    };

    if let Some(id) = incoming.id {
        match pending.lock().await.remove(&id) {
            Some(tx) => {
                let _ = tx.send(incoming);
            }
            None => trace!(id, "response for abandoned command"),
        }
        return true;
    }

    match incoming.method {
        Some(method) => {
            trace!(%method, "CDP event");
            events
                .send(CdpEventFrame {
                    method,
                    params: incoming.params.unwrap_or(serde_json::Value::Null),
                })
                .is_ok()
        }
        None => true,
    }
}
