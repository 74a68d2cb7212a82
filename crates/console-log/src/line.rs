//! Rendering of [`ConsoleMessage`]s into output lines.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::SecondsFormat;
use devtap_protocol::{ConsoleArg, ConsoleMessage, Location};
use serde::{Deserialize, Serialize};

use crate::format::interpolate;
use crate::render::render_console_arg;

/// Output line shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// `[time] [TYPE] (file:line:col) text` plus stack and `Args:` blocks.
    #[default]
    Structured,
    /// One serialized message per line.
    Json,
    /// Message text only.
    Raw,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(Self::Structured),
            "json" => Ok(Self::Json),
            "raw" => Ok(Self::Raw),
            other => Err(format!(
                "unknown output mode '{other}' (expected structured, json or raw)"
            )),
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Structured => "structured",
            Self::Json => "json",
            Self::Raw => "raw",
        })
    }
}

/// Formats messages for one output mode.
#[derive(Debug, Clone, Copy)]
pub struct LineFormatter {
    pub mode: OutputMode,
    pub timestamps: bool,
    pub stack_traces: bool,
}

impl Default for LineFormatter {
    fn default() -> Self {
        Self {
            mode: OutputMode::Structured,
            timestamps: true,
            stack_traces: true,
        }
    }
}

impl LineFormatter {
    pub fn new(mode: OutputMode, timestamps: bool, stack_traces: bool) -> Self {
        Self {
            mode,
            timestamps,
            stack_traces,
        }
    }

    /// Renders `msg` as newline-terminated text. Stack and `Args:` blocks
    /// add further lines in structured mode.
    pub fn format(&self, msg: &ConsoleMessage) -> String {
        let mut out = match self.mode {
            OutputMode::Raw => msg.text.clone(),
            OutputMode::Json => json_line(msg),
            OutputMode::Structured => self.structured(msg),
        };
        out.push('\n');
        out
    }

    fn structured(&self, msg: &ConsoleMessage) -> String {
        let mut line = String::new();
        if self.timestamps {
            let _ = write!(
                line,
                "[{}] ",
                msg.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
            );
        }
        let _ = write!(line, "[{}] ", msg.kind.label());
        if let Some(location) = msg.location.as_ref().filter(|l| !l.url.is_empty()) {
            let _ = write!(line, "({}) ", location_suffix(location));
        }
        line.push_str(&msg.text);

        if self.stack_traces {
            if let Some(stack) = msg.stack.as_deref().filter(|s| !s.is_empty()) {
                line.push('\n');
                line.push_str(stack);
            }
        }

        if !msg.args.is_empty() {
            let joined = render_args(&msg.args);
            let trimmed = joined.trim();
            if !trimmed.is_empty() && trimmed != msg.text.trim() {
                line.push_str("\n  Args: ");
                line.push_str(&joined);
            }
        }
        line
    }
}

/// `file:line:col`, or just the file name when no line is known.
fn location_suffix(location: &Location) -> String {
    let file = file_name(&location.url);
    if location.line_number == 0 {
        file.to_string()
    } else {
        format!("{file}:{}:{}", location.line_number, location.column_number)
    }
}

/// Last `/`-separated segment of `url`, or `url` itself when there is no
/// separator or the last segment is empty.
pub fn file_name(url: &str) -> &str {
    match url.rsplit_once('/') {
        Some((_, last)) if !last.is_empty() => last,
        _ => url,
    }
}

/// Renders stored arguments for the `Args:` block.
///
/// Raw protocol values are rendered the same way the message text was
/// built, so an uninterpolated copy never differs from the text.
pub fn render_args(args: &[ConsoleArg]) -> String {
    let remotes: Option<Vec<_>> = args
        .iter()
        .map(|arg| match arg {
            ConsoleArg::Remote(remote) => Some(remote.clone()),
            ConsoleArg::Value(_) => None,
        })
        .collect();
    match remotes {
        Some(remotes) => interpolate(&remotes),
        None => args
            .iter()
            .map(render_console_arg)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn json_line(msg: &ConsoleMessage) -> String {
    if let Ok(line) = serde_json::to_string(msg) {
        return line;
    }
    let trimmed = ConsoleMessage {
        args: Vec::new(),
        ..msg.clone()
    };
    serde_json::to_string(&trimmed).unwrap_or_else(|_| {
        serde_json::json!({"type": msg.kind.as_str(), "text": msg.text}).to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use devtap_protocol::cdp::RemoteObject;
    use devtap_protocol::console_log::browser_time;
    use devtap_protocol::{ConsoleType, MessageIdentity};
    use serde_json::json;

    const TS: f64 = 1_700_000_000_123.0;

    fn message(kind: ConsoleType, text: &str) -> ConsoleMessage {
        ConsoleMessage {
            kind,
            text: text.into(),
            timestamp: browser_time(TS).unwrap(),
            location: None,
            args: Vec::new(),
            stack: None,
            identity: MessageIdentity::Unique { seq: 0 },
        }
    }

    #[test]
    fn structured_end_to_end() {
        let mut msg = message(ConsoleType::Error, "Cannot read x");
        msg.location = Some(Location {
            url: "http://h/app.js".into(),
            line_number: 10,
            column_number: 3,
        });
        let line = LineFormatter::default().format(&msg);
        assert_eq!(
            line,
            "[2023-11-14T22:13:20.123Z] [ERROR] (app.js:10:3) Cannot read x\n"
        );
    }

    #[test]
    fn structured_without_timestamp() {
        let fmt = LineFormatter::new(OutputMode::Structured, false, true);
        let line = fmt.format(&message(ConsoleType::Warn, "careful"));
        assert_eq!(line, "[WARN] careful\n");
    }

    #[test]
    fn location_without_line() {
        let fmt = LineFormatter::new(OutputMode::Structured, false, true);
        let mut msg = message(ConsoleType::Log, "x");
        msg.location = Some(Location {
            url: "inline".into(),
            line_number: 0,
            column_number: 0,
        });
        assert_eq!(fmt.format(&msg), "[LOG] (inline) x\n");
    }

    #[test]
    fn stack_block_is_optional() {
        let mut msg = message(ConsoleType::Error, "boom");
        msg.stack = Some("    at f (a.js:1:1)".into());

        let with = LineFormatter::new(OutputMode::Structured, false, true).format(&msg);
        assert_eq!(with, "[ERROR] boom\n    at f (a.js:1:1)\n");

        let without = LineFormatter::new(OutputMode::Structured, false, false).format(&msg);
        assert_eq!(without, "[ERROR] boom\n");
    }

    #[test]
    fn args_block_when_different() {
        let fmt = LineFormatter::new(OutputMode::Structured, false, true);
        let mut msg = message(ConsoleType::Log, "user");
        msg.args = vec![ConsoleArg::Value(json!("user")), ConsoleArg::Value(json!({"id": 1}))];
        assert_eq!(
            fmt.format(&msg),
            "[LOG] user\n  Args: user {\n  \"id\": 1\n}\n"
        );
    }

    #[test]
    fn args_block_suppressed_when_redundant() {
        let fmt = LineFormatter::new(OutputMode::Structured, false, true);
        let mut msg = message(ConsoleType::Log, "a 1");
        msg.args = vec![ConsoleArg::Value(json!("a")), ConsoleArg::Value(json!(1))];
        assert_eq!(fmt.format(&msg), "[LOG] a 1\n");

        msg.text = "  a 1 ".into();
        assert_eq!(fmt.format(&msg), "[LOG]   a 1 \n");

        msg.args = vec![ConsoleArg::Value(json!("  "))];
        msg.text = "other".into();
        assert_eq!(fmt.format(&msg), "[LOG] other\n");
    }

    #[test]
    fn remote_args_never_repeat_interpolated_text() {
        let fmt = LineFormatter::new(OutputMode::Structured, false, true);
        let mut msg = message(ConsoleType::Log, "Count: 5");
        msg.args = vec![
            ConsoleArg::Remote(RemoteObject::string("Count: %d")),
            ConsoleArg::Remote(RemoteObject::number(5)),
        ];
        assert_eq!(fmt.format(&msg), "[LOG] Count: 5\n");
    }

    #[test]
    fn raw_mode_is_text_only() {
        let fmt = LineFormatter::new(OutputMode::Raw, true, true);
        let mut msg = message(ConsoleType::Error, "just text");
        msg.stack = Some("stack".into());
        assert_eq!(fmt.format(&msg), "just text\n");
    }

    #[test]
    fn json_mode_round_trips() {
        let fmt = LineFormatter::new(OutputMode::Json, true, true);
        let mut msg = message(ConsoleType::Warn, "w");
        msg.location = Some(Location {
            url: "http://h/app.js".into(),
            line_number: 2,
            column_number: 9,
        });
        msg.args = vec![ConsoleArg::Value(json!({"k": [1, 2]}))];
        msg.stack = Some("at x".into());
        msg.identity = MessageIdentity::Unique { seq: 4 };

        let line = fmt.format(&msg);
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let parsed: ConsoleMessage = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn file_name_extraction() {
        assert_eq!(file_name("https://x.test/app/main.js"), "main.js");
        assert_eq!(file_name("inline"), "inline");
        assert_eq!(file_name("https://x.test/app/"), "https://x.test/app/");
    }

    #[test]
    fn output_mode_parsing() {
        assert_eq!("json".parse::<OutputMode>(), Ok(OutputMode::Json));
        assert_eq!("RAW".parse::<OutputMode>(), Ok(OutputMode::Raw));
        assert_eq!("structured".parse::<OutputMode>(), Ok(OutputMode::Structured));
        assert!("xml".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::default().to_string(), "structured");
    }
}
