//! Capture lifecycle: attach to a page, stream its console, reconnect.

use std::sync::Arc;
use std::time::Duration;

use devtap_protocol::constants::DEFAULT_CDP_ENDPOINT;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::cdp::EventAdapter;
use crate::discovery;
use crate::error::ConsoleLogError;
use crate::pipeline::Pipeline;
use crate::session::CdpSession;

/// Backoff delays between reconnection attempts.
const BACKOFFS: &[Duration] = &[
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Where to find the page to capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// `host:port` of the browser's remote-debugging endpoint.
    pub endpoint: String,
    /// Page WebSocket URL. Skips discovery when set.
    pub ws_url: Option<String>,
    /// Substring selecting the page by URL or title.
    pub target_filter: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CDP_ENDPOINT.to_string(),
            ws_url: None,
            target_filter: None,
        }
    }
}

/// Browser console collector.
///
/// Runs one background task per capture session that feeds the shared
/// [`Pipeline`]. Stopping the collector ends the session and clears the
/// pipeline's dedup state.
pub struct Collector {
    config: CaptureConfig,
    pipeline: Pipeline,
    inner: Arc<Mutex<CollectorState>>,
}

struct CollectorState {
    cancel: Option<CancellationToken>,
}

/// Why one connection ended.
enum StreamEnd {
    /// Stop was requested.
    Cancelled,
    /// Connecting failed or an open connection dropped.
    Error {
        error: String,
        was_attached: bool,
    },
}

impl Collector {
    pub fn new(config: CaptureConfig, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline,
            inner: Arc::new(Mutex::new(CollectorState { cancel: None })),
        }
    }

    /// Starts capturing in the background.
    ///
    /// Idempotent: does nothing if already running.
    pub async fn start(&self) {
        let mut state = self.inner.lock().await;
        if state.cancel.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        state.cancel = Some(cancel.clone());

        let config = self.config.clone();
        let pipeline = self.pipeline.clone();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            collection_loop(config, pipeline, inner, cancel).await;
        });

        tracing::info!(endpoint = %self.config.endpoint, "console capture started");
    }

    /// Stops capturing and resets the dedup state.
    pub async fn stop(&self) {
        let mut state = self.inner.lock().await;
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
            self.pipeline.reset_session();
            tracing::info!("console capture stopped");
        }
    }

    /// Returns `true` while a capture session is active.
    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.cancel.is_some()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Connects, streams and reconnects until cancelled or out of retries.
///
/// The retry budget is restored whenever a connection was fully attached,
/// so only consecutive failures count toward giving up.
async fn collection_loop(
    config: CaptureConfig,
    pipeline: Pipeline,
    inner: Arc<Mutex<CollectorState>>,
    cancel: CancellationToken,
) {
    let mut attempt = 0usize;
    loop {
        if cancel.is_cancelled() {
            break;
        }

        if attempt > 0 {
            let delay = BACKOFFS[(attempt - 1).min(BACKOFFS.len() - 1)];
            tracing::debug!(?delay, attempt, "CDP reconnect backoff");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let end = match resolve_ws_url(&config).await {
            Ok(ws_url) => stream_session(&ws_url, &pipeline, &cancel).await,
            Err(e) => StreamEnd::Error {
                error: e.to_string(),
                was_attached: false,
            },
        };

        match end {
            StreamEnd::Cancelled => break,
            StreamEnd::Error {
                error,
                was_attached,
            } => {
                tracing::warn!(%error, "CDP connection ended");
                if was_attached {
                    pipeline.report_error(format!("Browser connection lost: {error}"));
                    attempt = 0;
                }
            }
        }

        attempt += 1;
        if attempt > BACKOFFS.len() {
            tracing::error!("giving up after {attempt} connection attempts");
            pipeline.report_error(format!(
                "Unable to attach to the browser at {} after {attempt} attempts",
                config.endpoint
            ));
            break;
        }
    }

    // A cancelled token was already taken by `stop`; a newer session may own
    // the slot by now.
    if !cancel.is_cancelled() {
        inner.lock().await.cancel = None;
    }
}

async fn resolve_ws_url(config: &CaptureConfig) -> Result<String, ConsoleLogError> {
    match &config.ws_url {
        Some(url) => Ok(url.clone()),
        None => discovery::discover_ws_url(&config.endpoint, config.target_filter.as_deref()).await,
    }
}

/// Attaches to one page and pumps its notifications into the pipeline.
async fn stream_session(ws_url: &str, pipeline: &Pipeline, cancel: &CancellationToken) -> StreamEnd {
    let (session, mut events) = match CdpSession::connect(ws_url).await {
        Ok(connected) => connected,
        Err(e) => {
            return StreamEnd::Error {
                error: format!("connect to {ws_url} failed: {e}"),
                was_attached: false,
            };
        }
    };
    if let Err(e) = session.enable_domains().await {
        return StreamEnd::Error {
            error: format!("enabling CDP domains failed: {e}"),
            was_attached: false,
        };
    }
    tracing::info!(ws_url, "attached to page");

    let mut adapter = EventAdapter::new();
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                session.close();
                return StreamEnd::Cancelled;
            }
            frame = events.recv() => frame,
        };
        let Some(frame) = frame else {
            return StreamEnd::Error {
                error: "CDP socket closed".into(),
                was_attached: true,
            };
        };
        let Some(raw) = adapter.adapt(&frame.method, &frame.params) else {
            continue;
        };
        tokio::select! {
            _ = cancel.cancelled() => {
                session.close();
                return StreamEnd::Cancelled;
            }
            _ = pipeline.ingest(raw, &session) => {}
        }
    }
}
