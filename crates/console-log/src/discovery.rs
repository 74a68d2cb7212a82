//! Target discovery over the browser's HTTP debugging endpoint.

use devtap_protocol::cdp::TargetInfo;
use devtap_protocol::constants::HTTP_TIMEOUT;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::ConsoleLogError;

/// Fetches the debuggable targets listed at `http://{endpoint}/json/list`.
pub async fn list_targets(endpoint: &str) -> Result<Vec<TargetInfo>, ConsoleLogError> {
    let body = http_get(endpoint, "/json/list").await?;
    serde_json::from_str(&body)
        .map_err(|e| ConsoleLogError::Discovery(format!("invalid target list: {e}")))
}

/// Picks the first page target with a WebSocket URL whose URL or title
/// contains `filter` (case-insensitive). No filter accepts any page.
pub fn select_target<'a>(targets: &'a [TargetInfo], filter: Option<&str>) -> Option<&'a TargetInfo> {
    let needle = filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_lowercase);
    targets.iter().find(|t| {
        t.target_type == "page"
            && !t.web_socket_debugger_url.is_empty()
            && needle.as_deref().is_none_or(|n| {
                t.url.to_lowercase().contains(n) || t.title.to_lowercase().contains(n)
            })
    })
}

/// Resolves the WebSocket URL of the page to attach to.
pub async fn discover_ws_url(endpoint: &str, filter: Option<&str>) -> Result<String, ConsoleLogError> {
    let targets = list_targets(endpoint).await?;
    let target = select_target(&targets, filter).ok_or_else(|| {
        ConsoleLogError::Discovery(match filter {
            Some(f) => format!("no page target matching '{f}' at {endpoint}"),
            None => format!("no page target at {endpoint}"),
        })
    })?;
    tracing::debug!(id = %target.id, url = %target.url, "selected CDP target");
    Ok(target.web_socket_debugger_url.clone())
}

/// Minimal HTTP/1.1 GET returning the response body.
async fn http_get(addr: &str, path: &str) -> Result<String, ConsoleLogError> {
    let mut stream = tokio::time::timeout(HTTP_TIMEOUT, tokio::net::TcpStream::connect(addr))
        .await
        .map_err(|_| ConsoleLogError::Discovery(format!("connection to {addr} timed out")))?
        .map_err(|e| ConsoleLogError::Discovery(format!("cannot connect to {addr}: {e}")))?;

    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    tokio::time::timeout(HTTP_TIMEOUT, stream.read_to_end(&mut response))
        .await
        .map_err(|_| ConsoleLogError::Discovery(format!("response from {addr} timed out")))??;

    let response = String::from_utf8_lossy(&response);
    let status_ok = response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .is_some_and(|code| code == "200");
    if !status_ok {
        let status = response.lines().next().unwrap_or_default();
        return Err(ConsoleLogError::Discovery(format!(
            "unexpected HTTP status from {addr}: {status}"
        )));
    }
    let body_start = response
        .find("\r\n\r\n")
        .map(|i| i + 4)
        .ok_or_else(|| ConsoleLogError::Discovery("malformed HTTP response".into()))?;
    Ok(response[body_start..].to_string())
}
