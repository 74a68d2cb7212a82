//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;
use devtap_console_log::OutputMode;

/// Stream a browser page's console to the terminal.
///
/// Attaches to a Chromium-based browser started with
/// `--remote-debugging-port`, prints every console message once, and
/// optionally runs a companion command (for example a dev server) whose
/// output is interleaved with the console.
#[derive(Parser, Debug)]
#[command(name = "devtap", version)]
pub struct Cli {
    /// Remote-debugging endpoint of the browser
    #[arg(long, value_name = "HOST:PORT")]
    pub endpoint: Option<String>,

    /// WebSocket debugger URL of the page; skips target discovery
    #[arg(long, value_name = "URL", conflicts_with = "endpoint")]
    pub ws_url: Option<String>,

    /// Attach to the first page whose URL or title contains this text
    #[arg(long, value_name = "FILTER")]
    pub tab: Option<String>,

    /// Also append output to a log file (`file:<path>` or a path)
    #[arg(short, long, value_name = "TARGET")]
    pub output: Option<String>,

    /// Line format: structured, json or raw
    #[arg(long, value_name = "MODE")]
    pub mode: Option<OutputMode>,

    /// Omit timestamps from structured lines
    #[arg(long)]
    pub no_timestamps: bool,

    /// Omit stack traces
    #[arg(long)]
    pub no_stack: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Console levels to show, comma separated (log,info,warn,error,debug or all)
    #[arg(long, value_name = "LIST")]
    pub levels: Option<String>,

    /// Configuration file (default: ~/.config/devtap/devtap.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log devtap's own diagnostics at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to run alongside the capture
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
