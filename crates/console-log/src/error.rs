//! Error types for console capture.

use tokio_tungstenite::tungstenite;

/// Errors produced while capturing and rendering console output.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleLogError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("target discovery failed: {0}")]
    Discovery(String),

    #[error("CDP error {code}: {message}")]
    Cdp { code: i64, message: String },

    #[error("cannot resolve argument: {0}")]
    Unresolvable(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection closed")]
    Closed,
}
