pub mod cdp;
pub mod console_log;
pub mod constants;
pub mod events;

// Re-export primary types for convenience.
pub use cdp::RemoteObject;
pub use console_log::{
    ConsoleArg, ConsoleMessage, ConsoleType, EventSource, Location, MessageIdentity, Severity,
};
pub use events::{
    PageErrorEvent, ProtocolValueEvent, RawEvent, RequestFailedEvent, StructuredEvent,
};
