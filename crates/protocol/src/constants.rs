use std::time::Duration;

/// Default remote-debugging endpoint of a locally launched Chromium.
pub const DEFAULT_CDP_ENDPOINT: &str = "127.0.0.1:9222";

/// Timeout for the HTTP target discovery request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for the WebSocket handshake.
pub const WS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a CDP command round trip.
pub const CDP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum CDP frame size accepted from the browser (64 MB).
pub const WS_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Console log level bitmask: `log` messages (and every type without a
/// dedicated bit, such as `dir`, `table` or `group`).
pub const LOG_LEVEL_LOG: u32 = 1;
/// Console log level bitmask: `warn` messages.
pub const LOG_LEVEL_WARN: u32 = 2;
/// Console log level bitmask: `error` messages.
pub const LOG_LEVEL_ERROR: u32 = 4;
/// Console log level bitmask: `info` messages.
pub const LOG_LEVEL_INFO: u32 = 8;
/// Console log level bitmask: `debug` messages.
pub const LOG_LEVEL_DEBUG: u32 = 16;
/// Every level enabled.
pub const LOG_LEVEL_ALL: u32 =
    LOG_LEVEL_LOG | LOG_LEVEL_WARN | LOG_LEVEL_ERROR | LOG_LEVEL_INFO | LOG_LEVEL_DEBUG;

/// Maps a level name to its bitmask bit. Returns 0 for unknown levels.
pub fn log_level_bit(level: &str) -> u32 {
    match level.to_ascii_lowercase().as_str() {
        "log" => LOG_LEVEL_LOG,
        "warn" | "warning" => LOG_LEVEL_WARN,
        "error" => LOG_LEVEL_ERROR,
        "info" => LOG_LEVEL_INFO,
        "debug" | "verbose" => LOG_LEVEL_DEBUG,
        _ => 0,
    }
}

/// Parses a comma separated level list (`"error,warn"`) into a bitmask.
///
/// `"all"` enables every level. Unknown names are ignored.
pub fn parse_level_mask(list: &str) -> u32 {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .fold(0, |mask, name| {
            if name.eq_ignore_ascii_case("all") {
                mask | LOG_LEVEL_ALL
            } else {
                mask | log_level_bit(name)
            }
        })
}
