//! Child-process output capture.
//!
//! Splits the raw stdout/stderr byte stream of a spawned command into lines
//! and hands each line, tagged with its stream, to a callback. The binary
//! writes those lines through the console sink with a `[name]` prefix.

mod child;
mod error;
mod lines;
mod pump;

pub use child::ChildProcess;
pub use error::ProcessLogError;
pub use lines::LineSplitter;
pub use pump::{OnLineFn, OutputPumps, pump_lines};

/// Which pipe of the child a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One complete line of child output, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessLine {
    pub stream: OutputStream,
    pub text: String,
}

/// Line prefix for a child named `name`: `[name] ` or `[name:err] `.
pub fn prefix(name: &str, stream: OutputStream) -> String {
    match stream {
        OutputStream::Stdout => format!("[{name}] "),
        OutputStream::Stderr => format!("[{name}:err] "),
    }
}
