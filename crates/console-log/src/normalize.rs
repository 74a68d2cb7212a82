//! Conversion of raw channel events into canonical [`ConsoleMessage`]s.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use devtap_protocol::cdp::RemoteObject;
use devtap_protocol::console_log::browser_time;
use devtap_protocol::events::{
    PageErrorEvent, ProtocolValueEvent, RequestFailedEvent, StructuredEvent,
};
use devtap_protocol::{
    ConsoleArg, ConsoleMessage, ConsoleType, EventSource, Location, MessageIdentity,
};
use futures_util::future::join_all;
use serde_json::Value;

use crate::error::ConsoleLogError;
use crate::format::interpolate;
use crate::render::render_arg;

/// Resolves a structured-channel argument to a JSON value.
pub trait ArgResolver: Sync {
    fn resolve(
        &self,
        arg: &RemoteObject,
    ) -> impl Future<Output = Result<Value, ConsoleLogError>> + Send;
}

/// Resolver that only uses values already carried inline by the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineResolver;

impl ArgResolver for InlineResolver {
    async fn resolve(&self, arg: &RemoteObject) -> Result<Value, ConsoleLogError> {
        inline_value(arg).ok_or_else(|| ConsoleLogError::Unresolvable(render_arg(arg)))
    }
}

/// Returns the JSON value carried by `arg` itself, if any.
pub fn inline_value(arg: &RemoteObject) -> Option<Value> {
    match arg.kind.as_str() {
        "undefined" => None,
        _ if arg.is_null() => Some(Value::Null),
        _ => arg.value.clone(),
    }
}

/// Builds [`ConsoleMessage`]s from either notification channel.
///
/// Holds the sequence counter for messages that carry no browser timestamp.
#[derive(Debug, Default)]
pub struct MessageNormalizer {
    seq: AtomicU64,
}

impl MessageNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes a protocol-value event. Events without arguments are dropped.
    pub fn normalize_protocol_value(&self, event: ProtocolValueEvent) -> Option<ConsoleMessage> {
        let args = event.args.unwrap_or_default();
        if args.is_empty() {
            return None;
        }

        let kind = ConsoleType::parse(&event.kind);
        let text = interpolate(&args);
        let location = event
            .url
            .filter(|url| !url.is_empty())
            .map(|url| Location {
                url,
                line_number: event.line.unwrap_or(0),
                column_number: event.column.unwrap_or(0),
            });

        let source = EventSource::ProtocolValue {
            context_id: event.execution_context_id,
            console_type: kind.clone(),
        };
        Some(ConsoleMessage {
            identity: self.identity(&kind, event.timestamp, source),
            timestamp: observed_at(event.timestamp),
            kind,
            text,
            location,
            args: args.into_iter().map(ConsoleArg::Remote).collect(),
            stack: None,
        })
    }

    /// Normalizes a structured event, resolving each argument independently.
    ///
    /// A failed resolution replaces that argument with its rendered text.
    /// Events with neither text nor arguments are dropped.
    pub async fn normalize_structured<R: ArgResolver>(
        &self,
        event: StructuredEvent,
        resolver: &R,
    ) -> Option<ConsoleMessage> {
        let has_text = event.text.as_deref().is_some_and(|t| !t.is_empty());
        if !has_text && event.args.is_empty() {
            return None;
        }

        let resolved = join_all(event.args.iter().map(|arg| async move {
            match resolver.resolve(arg).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(error = %e, "argument resolution failed, using text");
                    Value::String(render_arg(arg))
                }
            }
        }))
        .await;

        let text = match event.text {
            Some(text) if !text.is_empty() => text,
            _ => interpolate(&event.args),
        };
        let kind = ConsoleType::parse(&event.kind);

        Some(ConsoleMessage {
            identity: self.identity(&kind, event.timestamp, EventSource::Structured),
            timestamp: observed_at(event.timestamp),
            kind,
            text,
            location: event.location,
            args: resolved.into_iter().map(ConsoleArg::Value).collect(),
            stack: event.stack,
        })
    }

    /// Normalizes an uncaught page error into an `error` message.
    pub fn normalize_page_error(&self, event: PageErrorEvent) -> ConsoleMessage {
        let text = if event.message.is_empty() {
            "Uncaught exception".to_string()
        } else {
            event.message
        };
        ConsoleMessage {
            kind: ConsoleType::Error,
            text,
            timestamp: observed_at(event.timestamp),
            location: event.location,
            args: Vec::new(),
            stack: event.stack.filter(|s| !s.trim().is_empty()),
            identity: self.unique(),
        }
    }

    /// Normalizes a failed request or navigation into an `error` message.
    pub fn normalize_request_failed(&self, event: RequestFailedEvent) -> ConsoleMessage {
        let target = match event.method.as_deref() {
            Some(method) if !method.is_empty() => format!("{method} {}", event.url),
            _ => event.url,
        };
        let text = if event.error_text.is_empty() {
            format!("Failed to load {target}")
        } else {
            format!("Failed to load {target}: {}", event.error_text)
        };
        ConsoleMessage {
            kind: ConsoleType::Error,
            text,
            timestamp: Utc::now(),
            location: None,
            args: Vec::new(),
            stack: None,
            identity: self.unique(),
        }
    }

    /// Builds an `error` message describing a transport failure.
    pub fn transport_error(&self, text: impl Into<String>) -> ConsoleMessage {
        ConsoleMessage {
            kind: ConsoleType::Error,
            text: text.into(),
            timestamp: Utc::now(),
            location: None,
            args: Vec::new(),
            stack: None,
            identity: self.unique(),
        }
    }

    fn identity(
        &self,
        kind: &ConsoleType,
        timestamp: Option<f64>,
        source: EventSource,
    ) -> MessageIdentity {
        match timestamp.filter(|ts| ts.is_finite() && *ts > 0.0) {
            Some(ts) => MessageIdentity::from_browser_event(kind.severity(), ts, source),
            None => self.unique(),
        }
    }

    fn unique(&self) -> MessageIdentity {
        MessageIdentity::Unique {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        }
    }
}

fn observed_at(timestamp: Option<f64>) -> chrono::DateTime<Utc> {
    timestamp.and_then(browser_time).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devtap_protocol::Severity;
    use serde_json::json;

    const TS: f64 = 1_700_000_000_123.0;

    struct FailingResolver;

    impl ArgResolver for FailingResolver {
        async fn resolve(&self, _arg: &RemoteObject) -> Result<Value, ConsoleLogError> {
            Err(ConsoleLogError::Closed)
        }
    }

    fn remote(value: Value) -> RemoteObject {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn protocol_value_interpolates() {
        let n = MessageNormalizer::new();
        let msg = n
            .normalize_protocol_value(ProtocolValueEvent {
                kind: "log".into(),
                args: Some(vec![RemoteObject::string("Count: %d"), RemoteObject::number(5)]),
                timestamp: Some(TS),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(msg.text, "Count: 5");
        assert_eq!(msg.kind, ConsoleType::Log);
        assert_eq!(msg.args.len(), 2);
        assert!(matches!(msg.args[0], ConsoleArg::Remote(_)));
        assert_eq!(msg.timestamp.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(
            msg.identity,
            MessageIdentity::from_browser_event(
                Severity::Info,
                TS,
                EventSource::ProtocolValue {
                    context_id: None,
                    console_type: ConsoleType::Log,
                },
            )
        );
    }

    #[test]
    fn protocol_value_location_is_metadata() {
        let n = MessageNormalizer::new();
        let msg = n
            .normalize_protocol_value(ProtocolValueEvent {
                kind: "warning".into(),
                args: Some(vec![RemoteObject::string("careful")]),
                url: Some("http://h/app.js".into()),
                line: Some(4),
                column: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(msg.kind, ConsoleType::Warn);
        assert_eq!(msg.text, "careful");
        let loc = msg.location.unwrap();
        assert_eq!(loc.url, "http://h/app.js");
        assert_eq!((loc.line_number, loc.column_number), (4, 2));
    }

    #[test]
    fn protocol_value_without_args_dropped() {
        let n = MessageNormalizer::new();
        assert!(n
            .normalize_protocol_value(ProtocolValueEvent {
                kind: "log".into(),
                ..Default::default()
            })
            .is_none());
        assert!(n
            .normalize_protocol_value(ProtocolValueEvent {
                kind: "log".into(),
                args: Some(vec![]),
                ..Default::default()
            })
            .is_none());
    }

    #[test]
    fn missing_timestamp_gets_unique_identity() {
        let n = MessageNormalizer::new();
        let event = ProtocolValueEvent {
            kind: "log".into(),
            args: Some(vec![RemoteObject::string("x")]),
            ..Default::default()
        };
        let a = n.normalize_protocol_value(event.clone()).unwrap();
        let b = n.normalize_protocol_value(event).unwrap();
        assert_ne!(a.identity, b.identity);
        assert!(matches!(a.identity, MessageIdentity::Unique { .. }));
    }

    #[tokio::test]
    async fn structured_resolves_inline_values() {
        let n = MessageNormalizer::new();
        let msg = n
            .normalize_structured(
                StructuredEvent {
                    kind: "info".into(),
                    text: Some("hello 1".into()),
                    args: vec![RemoteObject::string("hello"), RemoteObject::number(1)],
                    timestamp: Some(TS),
                    ..Default::default()
                },
                &InlineResolver,
            )
            .await
            .unwrap();
        assert_eq!(msg.text, "hello 1");
        assert_eq!(
            msg.args,
            vec![ConsoleArg::Value(json!("hello")), ConsoleArg::Value(json!(1))]
        );
    }

    #[tokio::test]
    async fn structured_resolution_failure_falls_back_per_argument() {
        let n = MessageNormalizer::new();
        let msg = n
            .normalize_structured(
                StructuredEvent {
                    kind: "log".into(),
                    text: Some("obj".into()),
                    args: vec![
                        RemoteObject::object("Foo {a: 1}"),
                        remote(json!({"type": "undefined"})),
                    ],
                    ..Default::default()
                },
                &FailingResolver,
            )
            .await
            .unwrap();
        assert_eq!(
            msg.args,
            vec![
                ConsoleArg::Value(json!("Foo {a: 1}")),
                ConsoleArg::Value(json!("undefined")),
            ]
        );
    }

    #[tokio::test]
    async fn structured_without_text_derives_it() {
        let n = MessageNormalizer::new();
        let msg = n
            .normalize_structured(
                StructuredEvent {
                    kind: "log".into(),
                    args: vec![RemoteObject::string("%s!"), RemoteObject::string("hi")],
                    ..Default::default()
                },
                &InlineResolver,
            )
            .await
            .unwrap();
        assert_eq!(msg.text, "hi!");
    }

    #[tokio::test]
    async fn structured_empty_event_dropped() {
        let n = MessageNormalizer::new();
        let event = StructuredEvent {
            kind: "error".into(),
            text: Some(String::new()),
            ..Default::default()
        };
        assert!(n.normalize_structured(event, &InlineResolver).await.is_none());
    }

    #[tokio::test]
    async fn structured_keeps_location_and_stack() {
        let n = MessageNormalizer::new();
        let msg = n
            .normalize_structured(
                StructuredEvent {
                    kind: "error".into(),
                    text: Some("Cannot read x".into()),
                    location: Some(Location {
                        url: "http://h/app.js".into(),
                        line_number: 10,
                        column_number: 3,
                    }),
                    stack: Some("at f (app.js:10:3)".into()),
                    timestamp: Some(TS),
                    ..Default::default()
                },
                &InlineResolver,
            )
            .await
            .unwrap();
        assert_eq!(msg.location.unwrap().line_number, 10);
        assert_eq!(msg.stack.as_deref(), Some("at f (app.js:10:3)"));
        assert_eq!(
            msg.identity,
            MessageIdentity::from_browser_event(Severity::Error, TS, EventSource::Structured)
        );
    }

    #[tokio::test]
    async fn channels_share_event_key() {
        let n = MessageNormalizer::new();
        let b = n
            .normalize_protocol_value(ProtocolValueEvent {
                kind: "warning".into(),
                args: Some(vec![RemoteObject::string("w")]),
                timestamp: Some(TS),
                ..Default::default()
            })
            .unwrap();
        let a = n
            .normalize_structured(
                StructuredEvent {
                    kind: "warning".into(),
                    text: Some("w".into()),
                    timestamp: Some(TS),
                    ..Default::default()
                },
                &InlineResolver,
            )
            .await
            .unwrap();
        let key = |id: &MessageIdentity| match id {
            MessageIdentity::Event {
                severity,
                timestamp_us,
                ..
            } => Some((*severity, *timestamp_us)),
            MessageIdentity::Unique { .. } => None,
        };
        assert_eq!(key(&a.identity), Some((Severity::Warning, 1_700_000_000_123_000)));
        assert_eq!(key(&a.identity), key(&b.identity));
    }

    #[test]
    fn page_error() {
        let n = MessageNormalizer::new();
        let msg = n.normalize_page_error(PageErrorEvent {
            message: "Uncaught TypeError: x is undefined".into(),
            stack: Some("    at main (app.js:1:1)".into()),
            timestamp: Some(TS),
            location: None,
        });
        assert_eq!(msg.kind, ConsoleType::Error);
        assert_eq!(msg.text, "Uncaught TypeError: x is undefined");
        assert!(msg.stack.is_some());
        assert!(matches!(msg.identity, MessageIdentity::Unique { .. }));
    }

    #[test]
    fn request_failed_text() {
        let n = MessageNormalizer::new();
        let msg = n.normalize_request_failed(RequestFailedEvent {
            url: "http://h/api".into(),
            method: Some("POST".into()),
            error_text: "net::ERR_CONNECTION_REFUSED".into(),
        });
        assert_eq!(msg.kind, ConsoleType::Error);
        assert_eq!(
            msg.text,
            "Failed to load POST http://h/api: net::ERR_CONNECTION_REFUSED"
        );

        let msg = n.normalize_request_failed(RequestFailedEvent {
            url: "http://h/x.png".into(),
            method: None,
            error_text: String::new(),
        });
        assert_eq!(msg.text, "Failed to load http://h/x.png");
    }

    #[test]
    fn inline_values() {
        assert_eq!(inline_value(&RemoteObject::number(2)), Some(json!(2)));
        assert_eq!(
            inline_value(&remote(json!({"type": "object", "subtype": "null"}))),
            Some(Value::Null)
        );
        assert_eq!(inline_value(&remote(json!({"type": "undefined"}))), None);
        assert_eq!(inline_value(&RemoteObject::object("Foo")), None);
    }
}
