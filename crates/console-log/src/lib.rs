//! Browser console capture over the Chrome DevTools Protocol.
//!
//! Attaches to a page, listens on both console channels
//! (`Runtime.consoleAPICalled` and `Log.entryAdded`) plus uncaught
//! exceptions and failed requests, and emits each console event once as a
//! formatted, colored line on the terminal and an optional log file.

mod cdp;
pub mod collector;
mod color;
mod dedup;
pub mod discovery;
mod error;
mod format;
mod line;
mod normalize;
pub mod pipeline;
pub(crate) mod pumps;
mod render;
mod session;
mod sink;

pub use cdp::{EventAdapter, format_stack};
pub use collector::{CaptureConfig, Collector};
pub use color::{TermColor, color_for, color_for_name};
pub use dedup::DedupGate;
pub use discovery::{discover_ws_url, list_targets, select_target};
pub use error::ConsoleLogError;
pub use format::interpolate;
pub use line::{LineFormatter, OutputMode, file_name, render_args};
pub use normalize::{ArgResolver, InlineResolver, MessageNormalizer, inline_value};
pub use pipeline::{MessageHandler, Pipeline, PipelineConfig};
pub use pumps::CdpEventFrame;
pub use render::{render_arg, render_console_arg, render_object, render_preview, render_value};
pub use session::CdpSession;
pub use sink::{OutputSink, parse_file_target, strip_ansi};
