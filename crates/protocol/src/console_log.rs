use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cdp::RemoteObject;
use crate::constants::{LOG_LEVEL_DEBUG, LOG_LEVEL_ERROR, LOG_LEVEL_INFO, LOG_LEVEL_LOG, LOG_LEVEL_WARN};

/// Console message category.
///
/// Parsing is case-insensitive and folds protocol aliases (`warning`,
/// `verbose`, `startGroup`, ...) onto one canonical variant. Names outside
/// the known vocabulary are kept verbatim in [`ConsoleType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConsoleType {
    Log,
    Info,
    Warn,
    Error,
    Debug,
    Trace,
    Dir,
    DirXml,
    Table,
    Group,
    GroupCollapsed,
    GroupEnd,
    Assert,
    Count,
    CountReset,
    Time,
    TimeLog,
    TimeEnd,
    Profile,
    ProfileEnd,
    Clear,
    Other(String),
}

impl ConsoleType {
    /// Parses a console/log level name.
    pub fn parse(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "" | "log" => Self::Log,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            "debug" | "verbose" => Self::Debug,
            "trace" => Self::Trace,
            "dir" => Self::Dir,
            "dirxml" => Self::DirXml,
            "table" => Self::Table,
            "group" | "startgroup" => Self::Group,
            "groupcollapsed" | "startgroupcollapsed" => Self::GroupCollapsed,
            "groupend" | "endgroup" => Self::GroupEnd,
            "assert" => Self::Assert,
            "count" => Self::Count,
            "countreset" => Self::CountReset,
            "time" => Self::Time,
            "timelog" => Self::TimeLog,
            "timeend" => Self::TimeEnd,
            "profile" => Self::Profile,
            "profileend" => Self::ProfileEnd,
            "clear" => Self::Clear,
            _ => Self::Other(name.trim().to_string()),
        }
    }

    /// Canonical name, matching the `console` method that produced it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Dir => "dir",
            Self::DirXml => "dirxml",
            Self::Table => "table",
            Self::Group => "group",
            Self::GroupCollapsed => "groupCollapsed",
            Self::GroupEnd => "groupEnd",
            Self::Assert => "assert",
            Self::Count => "count",
            Self::CountReset => "countReset",
            Self::Time => "time",
            Self::TimeLog => "timeLog",
            Self::TimeEnd => "timeEnd",
            Self::Profile => "profile",
            Self::ProfileEnd => "profileEnd",
            Self::Clear => "clear",
            Self::Other(name) => name,
        }
    }

    /// Upper-cased label used in structured output (`[WARN]`).
    pub fn label(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }

    /// Level filter bit for this type.
    pub fn level_bit(&self) -> u32 {
        match self {
            Self::Error | Self::Assert => LOG_LEVEL_ERROR,
            Self::Warn => LOG_LEVEL_WARN,
            Self::Info => LOG_LEVEL_INFO,
            Self::Debug | Self::Trace => LOG_LEVEL_DEBUG,
            _ => LOG_LEVEL_LOG,
        }
    }

    /// Coarse severity, shared by both notification channels.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Error | Self::Assert => Severity::Error,
            Self::Warn => Severity::Warning,
            Self::Debug | Self::Trace => Severity::Verbose,
            _ => Severity::Info,
        }
    }
}

impl From<&str> for ConsoleType {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl From<String> for ConsoleType {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<ConsoleType> for String {
    fn from(kind: ConsoleType) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ConsoleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity buckets of the CDP `Log` domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

/// Notification channel a browser event arrived on, with whatever that
/// channel says about where the call came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "camelCase")]
pub enum EventSource {
    Structured,
    #[serde(rename_all = "camelCase")]
    ProtocolValue {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context_id: Option<i64>,
        console_type: ConsoleType,
    },
}

impl EventSource {
    /// Whether both values name the same notification channel.
    pub fn same_channel(&self, other: &EventSource) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Deduplication key for a console message.
///
/// Both notification channels stamp the same browser-side event with the
/// same timestamp, so `(severity, timestamp in µs)` pairs an event with its
/// copy on the other channel. `source` keeps same-channel events apart.
/// Events without a browser timestamp get a process-unique sequence number
/// and are never suppressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MessageIdentity {
    #[serde(rename_all = "camelCase")]
    Event {
        severity: Severity,
        timestamp_us: i64,
        source: EventSource,
    },
    Unique { seq: u64 },
}

impl MessageIdentity {
    /// Identity of a browser event reported at `timestamp_ms` (epoch ms).
    pub fn from_browser_event(severity: Severity, timestamp_ms: f64, source: EventSource) -> Self {
        Self::Event {
            severity,
            timestamp_us: (timestamp_ms * 1000.0).round() as i64,
            source,
        }
    }
}

/// Source position of a console call. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub url: String,
    #[serde(default)]
    pub line_number: u32,
    #[serde(default)]
    pub column_number: u32,
}

/// One console argument in either representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsoleArg {
    /// Resolved JSON value (structured channel).
    Value(serde_json::Value),
    /// Raw typed protocol value (protocol-value channel).
    Remote(RemoteObject),
}

/// Canonical console message produced by normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleMessage {
    #[serde(rename = "type")]
    pub kind: ConsoleType,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ConsoleArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub identity: MessageIdentity,
}

/// Converts a browser timestamp (epoch milliseconds, fractional) to UTC.
pub fn browser_time(timestamp_ms: f64) -> Option<DateTime<Utc>> {
    if !timestamp_ms.is_finite() || timestamp_ms <= 0.0 {
        return None;
    }
    DateTime::from_timestamp_micros((timestamp_ms * 1000.0).round() as i64)
}
