//! Error types for child-process capture.

/// Errors produced while running a child command and reading its output.
#[derive(Debug, thiserror::Error)]
pub enum ProcessLogError {
    #[error("no command given")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
