//! The capture pipeline: normalize, dedup, format, color, write.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use devtap_protocol::ConsoleMessage;
use devtap_protocol::constants::LOG_LEVEL_ALL;
use devtap_protocol::events::{
    PageErrorEvent, ProtocolValueEvent, RawEvent, RequestFailedEvent, StructuredEvent,
};

use crate::color::{TermColor, color_for};
use crate::dedup::DedupGate;
use crate::line::{LineFormatter, OutputMode};
use crate::normalize::{ArgResolver, MessageNormalizer};
use crate::sink::OutputSink;

/// Output settings of a capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub mode: OutputMode,
    pub timestamps: bool,
    pub stack_traces: bool,
    pub colors: bool,
    /// Append-only log file receiving a plain copy of the output.
    pub file: Option<PathBuf>,
    /// Bitmask of `LOG_LEVEL_*` bits to emit.
    pub level_mask: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Structured,
            timestamps: true,
            stack_traces: true,
            colors: true,
            file: None,
            level_mask: LOG_LEVEL_ALL,
        }
    }
}

/// Callback invoked with every emitted message.
pub type MessageHandler = Box<dyn Fn(&ConsoleMessage) + Send + Sync>;

/// Shared handle to one capture session's output.
///
/// Cloning is cheap; clones feed the same dedup set and sink. The dedup
/// check, formatting and write for one message happen under one lock, so
/// two channels delivering the same event at once emit it exactly once.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    normalizer: MessageNormalizer,
    formatter: LineFormatter,
    level_mask: AtomicU32,
    state: Mutex<PipelineState>,
    handlers: Mutex<Vec<MessageHandler>>,
}

struct PipelineState {
    gate: DedupGate,
    sink: OutputSink,
    closed: bool,
}

impl Pipeline {
    /// Creates a pipeline writing to standard output and, when configured,
    /// to the log file. A log file that cannot be opened is reported and
    /// skipped.
    pub fn new(config: PipelineConfig) -> Self {
        let sink = OutputSink::stdout(config.colors);
        Self::with_sink(config, sink)
    }

    /// Creates a pipeline around an existing sink.
    pub fn with_sink(config: PipelineConfig, mut sink: OutputSink) -> Self {
        if let Some(path) = &config.file {
            if let Err(e) = sink.attach_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "cannot open log file, continuing without it");
            }
        }
        let formatter = LineFormatter::new(config.mode, config.timestamps, config.stack_traces);
        Self {
            inner: Arc::new(PipelineInner {
                normalizer: MessageNormalizer::new(),
                formatter,
                level_mask: AtomicU32::new(config.level_mask),
                state: Mutex::new(PipelineState {
                    gate: DedupGate::new(),
                    sink,
                    closed: false,
                }),
                handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Registers a callback for every message that passes the dedup gate.
    pub fn on_normalized_message(&self, handler: MessageHandler) {
        lock(&self.inner.handlers).push(handler);
    }

    pub fn normalizer(&self) -> &MessageNormalizer {
        &self.inner.normalizer
    }

    /// Emits a normalized message. Returns `false` when it was filtered by
    /// level, suppressed as a duplicate, or the pipeline is closed.
    pub fn submit(&self, msg: ConsoleMessage) -> bool {
        if self.level_mask() & msg.kind.level_bit() == 0 {
            return false;
        }

        {
            let mut state = lock(&self.inner.state);
            if state.closed || !state.gate.admit(&msg.identity) {
                return false;
            }
            let line = self.inner.formatter.format(&msg);
            let color = (self.inner.formatter.mode == OutputMode::Structured)
                .then(|| color_for(&msg.kind));
            state.sink.write_line(&line, color);
        }

        for handler in lock(&self.inner.handlers).iter() {
            handler(&msg);
        }
        true
    }

    pub fn ingest_protocol_value(&self, event: ProtocolValueEvent) -> bool {
        match self.inner.normalizer.normalize_protocol_value(event) {
            Some(msg) => self.submit(msg),
            None => false,
        }
    }

    pub async fn ingest_structured<R: ArgResolver>(
        &self,
        event: StructuredEvent,
        resolver: &R,
    ) -> bool {
        match self.inner.normalizer.normalize_structured(event, resolver).await {
            Some(msg) => self.submit(msg),
            None => false,
        }
    }

    pub fn ingest_page_error(&self, event: PageErrorEvent) -> bool {
        self.submit(self.inner.normalizer.normalize_page_error(event))
    }

    pub fn ingest_request_failed(&self, event: RequestFailedEvent) -> bool {
        self.submit(self.inner.normalizer.normalize_request_failed(event))
    }

    /// Routes any raw event to its normalizer.
    pub async fn ingest<R: ArgResolver>(&self, event: RawEvent, resolver: &R) -> bool {
        match event {
            RawEvent::Structured(e) => self.ingest_structured(e, resolver).await,
            RawEvent::ProtocolValue(e) => self.ingest_protocol_value(e),
            RawEvent::PageError(e) => self.ingest_page_error(e),
            RawEvent::RequestFailed(e) => self.ingest_request_failed(e),
        }
    }

    /// Emits a transport-level failure as an `error` message.
    pub fn report_error(&self, text: impl Into<String>) -> bool {
        self.submit(self.inner.normalizer.transport_error(text))
    }

    /// Writes pre-formatted text straight to the sink, bypassing
    /// normalization and dedup.
    pub fn write_passthrough(&self, text: &str, color: Option<TermColor>) {
        let mut state = lock(&self.inner.state);
        if !state.closed {
            state.sink.write_line(text, color);
        }
    }

    /// Forgets every identity seen so far.
    pub fn reset_session(&self) {
        lock(&self.inner.state).gate.clear();
        tracing::debug!("dedup state cleared");
    }

    pub fn level_mask(&self) -> u32 {
        self.inner.level_mask.load(Ordering::Relaxed)
    }

    /// Changes the level filter. Takes effect for the next message.
    pub fn set_level_mask(&self, mask: u32) {
        self.inner.level_mask.store(mask, Ordering::Relaxed);
        tracing::debug!(mask, "level mask updated");
    }

    pub fn mode(&self) -> OutputMode {
        self.inner.formatter.mode
    }

    /// Closes the sink. Later messages are dropped.
    pub fn close(&self) {
        let mut state = lock(&self.inner.state);
        if !state.closed {
            state.closed = true;
            state.sink.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.inner.state).closed
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
