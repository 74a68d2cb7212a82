//! WebSocket pumps backing a [`CdpSession`](crate::session::CdpSession).

use std::collections::HashMap;
use std::sync::Arc;

use devtap_protocol::cdp::CdpIncoming;
use tokio::sync::{Mutex, oneshot};

pub(crate) mod read;
pub(crate) mod write;

/// Command responses awaited by id.
pub(crate) type PendingMap = Arc<Mutex<HashMap<i64, oneshot::Sender<CdpIncoming>>>>;

/// A CDP notification forwarded to the session owner.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEventFrame {
    pub method: String,
    pub params: serde_json::Value,
}
