//! Translation of CDP notifications into raw pipeline events.
//!
//! `Runtime.consoleAPICalled` feeds the protocol-value channel and
//! `Log.entryAdded` the structured channel. Uncaught exceptions and failed
//! network requests become page-error and request-failure events.

use std::collections::HashMap;

use devtap_protocol::cdp::{
    ConsoleApiCalledParams, ExceptionThrownParams, LoadingFailedParams, LogEntryAddedParams,
    RequestWillBeSentParams, StackTrace,
};
use devtap_protocol::events::{
    PageErrorEvent, ProtocolValueEvent, RawEvent, RequestFailedEvent, StructuredEvent,
};
use devtap_protocol::Location;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// In-flight requests tracked before the table is reset.
const MAX_TRACKED_REQUESTS: usize = 4096;

/// Stateful CDP event adapter.
///
/// Remembers the URL and method of in-flight requests so that a later
/// `Network.loadingFailed` can name what failed.
#[derive(Debug, Default)]
pub struct EventAdapter {
    requests: HashMap<String, (String, String)>,
}

impl EventAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps one CDP notification to a raw event. Returns `None` for
    /// notifications that carry no console output or fail to parse.
    pub fn adapt(&mut self, method: &str, params: &Value) -> Option<RawEvent> {
        match method {
            "Runtime.consoleAPICalled" => {
                let p: ConsoleApiCalledParams = parse(method, params)?;
                Some(RawEvent::ProtocolValue(console_api_called(p)))
            }
            "Log.entryAdded" => {
                let p: LogEntryAddedParams = parse(method, params)?;
                Some(RawEvent::Structured(log_entry_added(p)))
            }
            "Runtime.exceptionThrown" => {
                let p: ExceptionThrownParams = parse(method, params)?;
                Some(RawEvent::PageError(exception_thrown(p)))
            }
            "Network.requestWillBeSent" => {
                let p: RequestWillBeSentParams = parse(method, params)?;
                if self.requests.len() >= MAX_TRACKED_REQUESTS {
                    tracing::debug!("request table full, resetting");
                    self.requests.clear();
                }
                self.requests
                    .insert(p.request_id, (p.request.url, p.request.method));
                None
            }
            "Network.loadingFinished" => {
                if let Some(id) = params.get("requestId").and_then(Value::as_str) {
                    self.requests.remove(id);
                }
                None
            }
            "Network.loadingFailed" => {
                let p: LoadingFailedParams = parse(method, params)?;
                let request = self.requests.remove(&p.request_id);
                if p.canceled {
                    return None;
                }
                let (url, method) = match request {
                    Some((url, method)) => (url, Some(method).filter(|m| !m.is_empty())),
                    None => (format!("request {}", p.request_id), None),
                };
                let error_text = match p.blocked_reason {
                    Some(reason) if p.error_text.is_empty() => format!("blocked ({reason})"),
                    _ => p.error_text,
                };
                Some(RawEvent::RequestFailed(RequestFailedEvent {
                    url,
                    method,
                    error_text,
                }))
            }
            "Runtime.executionContextsCleared" => {
                tracing::debug!("execution contexts cleared (navigation)");
                None
            }
            _ => None,
        }
    }

    /// Number of requests currently tracked.
    pub fn tracked_requests(&self) -> usize {
        self.requests.len()
    }
}

fn parse<T: DeserializeOwned>(method: &str, params: &Value) -> Option<T> {
    match serde_json::from_value::<T>(params.clone()) {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::debug!(method, error = %e, "malformed CDP event");
            None
        }
    }
}

fn console_api_called(p: ConsoleApiCalledParams) -> ProtocolValueEvent {
    let top = p
        .stack_trace
        .as_ref()
        .and_then(|st| st.call_frames.first())
        .filter(|frame| !frame.url.is_empty());
    ProtocolValueEvent {
        kind: p.call_type,
        args: Some(p.args),
        url: top.map(|f| f.url.clone()),
        line: top.map(|f| one_based(f.line_number)),
        column: top.map(|f| one_based(f.column_number)),
        timestamp: positive(p.timestamp),
        execution_context_id: Some(p.execution_context_id),
    }
}

fn log_entry_added(p: LogEntryAddedParams) -> StructuredEvent {
    let entry = p.entry;
    let top = entry
        .stack_trace
        .as_ref()
        .and_then(|st| st.call_frames.first())
        .filter(|frame| !frame.url.is_empty());
    let location = match top {
        Some(frame) => Some(Location {
            url: frame.url.clone(),
            line_number: one_based(frame.line_number),
            column_number: one_based(frame.column_number),
        }),
        None => entry.url.filter(|u| !u.is_empty()).map(|url| Location {
            url,
            line_number: entry.line_number.map(one_based).unwrap_or(0),
            column_number: 0,
        }),
    };
    StructuredEvent {
        kind: entry.level,
        text: Some(entry.text),
        args: entry.args,
        timestamp: positive(entry.timestamp),
        location,
        stack: None,
    }
}

fn exception_thrown(p: ExceptionThrownParams) -> PageErrorEvent {
    let details = p.exception_details;
    let description = details
        .exception
        .as_ref()
        .and_then(|e| e.description.clone())
        .unwrap_or_default();
    let (headline, trace) = match description.split_once('\n') {
        Some((head, rest)) => (head.to_string(), Some(rest.to_string())),
        None => (description.clone(), None),
    };

    let message = match (details.text.is_empty(), headline.is_empty()) {
        (false, false) => format!("{} {headline}", details.text),
        (false, true) => details.text.clone(),
        (true, _) => headline,
    };
    let stack = trace
        .filter(|t| !t.trim().is_empty())
        .or_else(|| details.stack_trace.as_ref().map(format_stack))
        .filter(|s| !s.is_empty());
    let location = details.url.filter(|u| !u.is_empty()).map(|url| Location {
        url,
        line_number: one_based(details.line_number),
        column_number: one_based(details.column_number),
    });

    PageErrorEvent {
        message,
        stack,
        timestamp: positive(p.timestamp),
        location,
    }
}

/// Renders call frames the way V8 prints them, one `at` line per frame.
pub fn format_stack(stack: &StackTrace) -> String {
    stack
        .call_frames
        .iter()
        .map(|frame| {
            let name = if frame.function_name.is_empty() {
                "<anonymous>"
            } else {
                frame.function_name.as_str()
            };
            format!(
                "    at {name} ({}:{}:{})",
                frame.url,
                one_based(frame.line_number),
                one_based(frame.column_number)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn one_based(n: i64) -> u32 {
    u32::try_from(n.saturating_add(1)).unwrap_or(0)
}

fn positive(ts: f64) -> Option<f64> {
    (ts.is_finite() && ts > 0.0).then_some(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TS: f64 = 1_700_000_000_123.5;

    #[test]
    fn console_api_called_maps_to_protocol_value() {
        let mut adapter = EventAdapter::new();
        let event = adapter
            .adapt(
                "Runtime.consoleAPICalled",
                &json!({
                    "type": "warning",
                    "args": [{"type": "string", "value": "Count: %d"}, {"type": "number", "value": 5}],
                    "executionContextId": 3,
                    "timestamp": TS,
                    "stackTrace": {"callFrames": [{
                        "functionName": "main", "scriptId": "1", "url": "http://h/app.js",
                        "lineNumber": 9, "columnNumber": 2
                    }]}
                }),
            )
            .unwrap();
        let RawEvent::ProtocolValue(e) = event else {
            panic!("expected protocol-value event");
        };
        assert_eq!(e.kind, "warning");
        assert_eq!(e.args.as_ref().unwrap().len(), 2);
        assert_eq!(e.url.as_deref(), Some("http://h/app.js"));
        assert_eq!((e.line, e.column), (Some(10), Some(3)));
        assert_eq!(e.timestamp, Some(TS));
        assert_eq!(e.execution_context_id, Some(3));
    }

    #[test]
    fn log_entry_maps_to_structured() {
        let mut adapter = EventAdapter::new();
        let event = adapter
            .adapt(
                "Log.entryAdded",
                &json!({"entry": {
                    "source": "network",
                    "level": "error",
                    "text": "Failed to load resource: 404",
                    "timestamp": TS,
                    "url": "http://h/missing.png",
                    "lineNumber": 0
                }}),
            )
            .unwrap();
        let RawEvent::Structured(e) = event else {
            panic!("expected structured event");
        };
        assert_eq!(e.kind, "error");
        assert_eq!(e.text.as_deref(), Some("Failed to load resource: 404"));
        let loc = e.location.unwrap();
        assert_eq!(loc.url, "http://h/missing.png");
        assert_eq!(loc.line_number, 1);
        assert!(e.stack.is_none());
    }

    #[test]
    fn log_entry_without_url_has_no_location() {
        let mut adapter = EventAdapter::new();
        let Some(RawEvent::Structured(e)) = adapter.adapt(
            "Log.entryAdded",
            &json!({"entry": {"source": "other", "level": "verbose", "text": "x", "timestamp": TS}}),
        ) else {
            panic!("expected structured event");
        };
        assert!(e.location.is_none());
    }

    #[test]
    fn exception_thrown_maps_to_page_error() {
        let mut adapter = EventAdapter::new();
        let Some(RawEvent::PageError(e)) = adapter.adapt(
            "Runtime.exceptionThrown",
            &json!({
                "timestamp": TS,
                "exceptionDetails": {
                    "exceptionId": 1,
                    "text": "Uncaught",
                    "lineNumber": 4,
                    "columnNumber": 10,
                    "url": "http://h/app.js",
                    "exception": {
                        "type": "object",
                        "subtype": "error",
                        "className": "TypeError",
                        "description": "TypeError: x is undefined\n    at f (http://h/app.js:5:11)"
                    }
                }
            }),
        ) else {
            panic!("expected page error");
        };
        assert_eq!(e.message, "Uncaught TypeError: x is undefined");
        assert_eq!(e.stack.as_deref(), Some("    at f (http://h/app.js:5:11)"));
        let loc = e.location.unwrap();
        assert_eq!((loc.line_number, loc.column_number), (5, 11));
    }

    #[test]
    fn exception_without_description_uses_stack_trace() {
        let mut adapter = EventAdapter::new();
        let Some(RawEvent::PageError(e)) = adapter.adapt(
            "Runtime.exceptionThrown",
            &json!({
                "timestamp": TS,
                "exceptionDetails": {
                    "text": "Uncaught SyntaxError",
                    "stackTrace": {"callFrames": [
                        {"functionName": "", "url": "http://h/a.js", "lineNumber": 0, "columnNumber": 0}
                    ]}
                }
            }),
        ) else {
            panic!("expected page error");
        };
        assert_eq!(e.message, "Uncaught SyntaxError");
        assert_eq!(e.stack.as_deref(), Some("    at <anonymous> (http://h/a.js:1:1)"));
    }

    #[test]
    fn failed_request_names_url_and_method() {
        let mut adapter = EventAdapter::new();
        assert!(adapter
            .adapt(
                "Network.requestWillBeSent",
                &json!({"requestId": "r1", "request": {"url": "http://h/api", "method": "POST"}}),
            )
            .is_none());
        assert_eq!(adapter.tracked_requests(), 1);

        let Some(RawEvent::RequestFailed(e)) = adapter.adapt(
            "Network.loadingFailed",
            &json!({"requestId": "r1", "errorText": "net::ERR_CONNECTION_REFUSED", "type": "Fetch"}),
        ) else {
            panic!("expected request failure");
        };
        assert_eq!(e.url, "http://h/api");
        assert_eq!(e.method.as_deref(), Some("POST"));
        assert_eq!(e.error_text, "net::ERR_CONNECTION_REFUSED");
        assert_eq!(adapter.tracked_requests(), 0);
    }

    #[test]
    fn canceled_and_finished_requests_are_silent() {
        let mut adapter = EventAdapter::new();
        for id in ["a", "b"] {
            adapter.adapt(
                "Network.requestWillBeSent",
                &json!({"requestId": id, "request": {"url": "http://h/", "method": "GET"}}),
            );
        }
        assert!(adapter
            .adapt(
                "Network.loadingFailed",
                &json!({"requestId": "a", "errorText": "net::ERR_ABORTED", "canceled": true}),
            )
            .is_none());
        adapter.adapt("Network.loadingFinished", &json!({"requestId": "b"}));
        assert_eq!(adapter.tracked_requests(), 0);
    }

    #[test]
    fn blocked_request_without_error_text() {
        let mut adapter = EventAdapter::new();
        let Some(RawEvent::RequestFailed(e)) = adapter.adapt(
            "Network.loadingFailed",
            &json!({"requestId": "zz", "errorText": "", "blockedReason": "csp"}),
        ) else {
            panic!("expected request failure");
        };
        assert_eq!(e.url, "request zz");
        assert_eq!(e.error_text, "blocked (csp)");
    }

    #[test]
    fn ignored_and_malformed_events() {
        let mut adapter = EventAdapter::new();
        assert!(adapter.adapt("Page.loadEventFired", &json!({})).is_none());
        assert!(adapter.adapt("Runtime.executionContextsCleared", &json!({})).is_none());
        assert!(adapter.adapt("Runtime.consoleAPICalled", &json!({"args": 5})).is_none());
    }

    #[test]
    fn zero_timestamp_is_absent() {
        let mut adapter = EventAdapter::new();
        let Some(RawEvent::ProtocolValue(e)) = adapter.adapt(
            "Runtime.consoleAPICalled",
            &json!({"type": "log", "args": [{"type": "string", "value": "x"}]}),
        ) else {
            panic!("expected protocol-value event");
        };
        assert!(e.timestamp.is_none());
        assert!(e.url.is_none());
    }
}
