//! CDP WebSocket session: command round trips plus a notification stream.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use devtap_protocol::cdp::{CdpCommand, RemoteObject};
use devtap_protocol::constants::{CDP_REQUEST_TIMEOUT, WS_HANDSHAKE_TIMEOUT, WS_MAX_MESSAGE_SIZE};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

use crate::error::ConsoleLogError;
use crate::normalize::{ArgResolver, inline_value};
use crate::pumps::{CdpEventFrame, PendingMap};
use crate::render::render_arg;

/// Domains enabled on every session.
const DOMAINS: &[&str] = &["Runtime.enable", "Log.enable", "Network.enable"];

/// Returns the receiver of `this`, serialized by value.
const RETURN_THIS: &str = "function() { return this; }";

/// A connected CDP target.
///
/// Notifications arrive on the receiver returned by [`CdpSession::connect`];
/// it yields `None` once the socket is gone.
pub struct CdpSession {
    outbound: mpsc::Sender<tungstenite::Message>,
    pending: PendingMap,
    next_id: AtomicI64,
    cancel: CancellationToken,
    read_handle: JoinHandle<()>,
    write_handle: JoinHandle<()>,
}

impl CdpSession {
    /// Opens the WebSocket and starts the read and write pumps.
    pub async fn connect(
        ws_url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CdpEventFrame>), ConsoleLogError> {
        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);

        let (ws_stream, _) = tokio::time::timeout(
            WS_HANDSHAKE_TIMEOUT,
            tokio_tungstenite::connect_async_with_config(ws_url, Some(ws_config), false),
        )
        .await
        .map_err(|_| ConsoleLogError::Timeout)??;
        let (sink, stream) = ws_stream.split();

        let (outbound, outbound_rx) = mpsc::channel::<tungstenite::Message>(64);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let cancel = CancellationToken::new();

        let write_handle = tokio::spawn(crate::pumps::write::write_pump(
            sink,
            outbound_rx,
            cancel.clone(),
        ));
        let read_handle = tokio::spawn(crate::pumps::read::read_pump(
            stream,
            pending.clone(),
            events_tx,
            outbound.clone(),
            cancel.clone(),
        ));

        tracing::debug!(ws_url, "CDP session connected");
        let session = Self {
            outbound,
            pending,
            next_id: AtomicI64::new(1),
            cancel,
            read_handle,
            write_handle,
        };
        Ok((session, events_rx))
    }

    /// Sends a command and waits for its `result`.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value, ConsoleLogError> {
        if self.cancel.is_cancelled() {
            return Err(ConsoleLogError::Closed);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let json = serde_json::to_string(&CdpCommand { id, method, params })?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if self
            .outbound
            .send(tungstenite::Message::Text(json.into()))
            .await
            .is_err()
        {
            self.pending.lock().await.remove(&id);
            return Err(ConsoleLogError::Closed);
        }

        let result = tokio::time::timeout(CDP_REQUEST_TIMEOUT, rx).await;
        self.pending.lock().await.remove(&id);

        match result {
            Ok(Ok(resp)) => match resp.error {
                Some(err) => Err(ConsoleLogError::Cdp {
                    code: err.code,
                    message: err.message,
                }),
                None => Ok(resp.result.unwrap_or(Value::Null)),
            },
            Ok(Err(_)) => Err(ConsoleLogError::Closed),
            Err(_) => Err(ConsoleLogError::Timeout),
        }
    }

    /// Enables the domains that report console activity.
    pub async fn enable_domains(&self) -> Result<(), ConsoleLogError> {
        for method in DOMAINS {
            self.send_command(method, json!({})).await?;
        }
        Ok(())
    }

    /// Serializes a remote object by value through `Runtime.callFunctionOn`.
    async fn fetch_by_value(&self, object_id: &str) -> Result<Value, ConsoleLogError> {
        let reply = self
            .send_command(
                "Runtime.callFunctionOn",
                json!({
                    "objectId": object_id,
                    "functionDeclaration": RETURN_THIS,
                    "returnByValue": true,
                    "silent": true,
                }),
            )
            .await?;

        if reply.get("exceptionDetails").is_some() {
            return Err(ConsoleLogError::Unresolvable(format!(
                "exception while serializing {object_id}"
            )));
        }
        let remote: RemoteObject = serde_json::from_value(reply["result"].clone())?;
        inline_value(&remote).ok_or_else(|| ConsoleLogError::Unresolvable(render_arg(&remote)))
    }

    /// Returns `true` while the socket is open.
    pub fn is_open(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Closes the socket.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl ArgResolver for CdpSession {
    async fn resolve(&self, arg: &RemoteObject) -> Result<Value, ConsoleLogError> {
        if let Some(value) = inline_value(arg) {
            return Ok(value);
        }
        match arg.object_id.as_deref() {
            Some(object_id) => self.fetch_by_value(object_id).await,
            None => Err(ConsoleLogError::Unresolvable(render_arg(arg))),
        }
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.read_handle.abort();
        self.write_handle.abort();
    }
}
