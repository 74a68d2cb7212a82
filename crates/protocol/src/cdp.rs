//! Chrome DevTools Protocol payload shapes.
//!
//! Only the subset of the `Runtime`, `Log` and `Network` domains needed to
//! observe console activity is modelled. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// A mirror object referencing an original JavaScript value
/// (`Runtime.RemoteObject`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// `string`, `number`, `boolean`, `undefined`, `object`, `function`,
    /// `symbol` or `bigint`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Primitive values JSON cannot carry: `NaN`, `Infinity`, `-0`, bigints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unserializable_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<ObjectPreview>,
}

impl RemoteObject {
    /// A `string` typed value.
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            kind: "string".into(),
            value: Some(serde_json::Value::String(value.into())),
            ..Self::default()
        }
    }

    /// A `number` typed value.
    pub fn number(value: impl Into<serde_json::Number>) -> Self {
        Self {
            kind: "number".into(),
            value: Some(serde_json::Value::Number(value.into())),
            ..Self::default()
        }
    }

    /// An `object` typed value with an engine-provided description.
    pub fn object(description: impl Into<String>) -> Self {
        Self {
            kind: "object".into(),
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Returns `true` for `object` values whose subtype is `null`.
    pub fn is_null(&self) -> bool {
        self.kind == "object" && self.subtype.as_deref() == Some("null")
    }
}

/// Abbreviated object contents (`Runtime.ObjectPreview`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPreview {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub overflow: bool,
    #[serde(default)]
    pub properties: Vec<PropertyPreview>,
}

/// One property inside an [`ObjectPreview`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPreview {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

/// Call frames for assertions or error messages (`Runtime.StackTrace`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTrace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub call_frames: Vec<CallFrame>,
}

/// A stack frame. Line and column numbers are 0-based.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    #[serde(default)]
    pub function_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub line_number: i64,
    #[serde(default)]
    pub column_number: i64,
}

/// `Runtime.consoleAPICalled` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleApiCalledParams {
    #[serde(rename = "type")]
    pub call_type: String,
    #[serde(default)]
    pub args: Vec<RemoteObject>,
    #[serde(default)]
    pub execution_context_id: i64,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// `Log.entryAdded` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntryAddedParams {
    pub entry: LogEntry,
}

/// A `Log.LogEntry`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub text: String,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<RemoteObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_request_id: Option<String>,
}

/// `Runtime.exceptionThrown` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionThrownParams {
    #[serde(default)]
    pub timestamp: f64,
    pub exception_details: ExceptionDetails,
}

/// `Runtime.ExceptionDetails`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    #[serde(default)]
    pub exception_id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub line_number: i64,
    #[serde(default)]
    pub column_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<RemoteObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_context_id: Option<i64>,
}

/// `Network.requestWillBeSent` parameters (subset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSentParams {
    pub request_id: String,
    pub request: NetworkRequest,
}

/// `Network.Request` (subset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub url: String,
    #[serde(default)]
    pub method: String,
}

/// `Network.loadingFailed` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFailedParams {
    pub request_id: String,
    #[serde(default)]
    pub error_text: String,
    #[serde(default)]
    pub canceled: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

/// CDP command sent to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct CdpCommand<'a> {
    pub id: i64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

/// Any frame received from the browser: a command response (with `id`) or
/// an event (with `method`).
#[derive(Debug, Clone, Deserialize)]
pub struct CdpIncoming {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<CdpErrorBody>,
}

/// Error payload of a failed CDP command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CdpErrorBody {
    pub code: i64,
    pub message: String,
}

/// A debuggable target listed by `GET /json/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub target_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: String,
}
