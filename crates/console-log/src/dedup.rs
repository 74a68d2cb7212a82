use std::collections::HashMap;

use devtap_protocol::{EventSource, MessageIdentity, Severity};

/// An emitted event, remembered under its `(severity, timestamp)` key.
#[derive(Debug)]
struct SeenEvent {
    source: EventSource,
    /// Set once the copy from the other channel has been suppressed.
    paired: bool,
}

/// Suppresses the second-channel copy of an event already emitted.
///
/// An event is dropped when an unpaired event with the same key arrived on
/// the other channel, or when a protocol-value event repeats one with the
/// same context and console type. Other same-channel events never suppress
/// each other. Scoped to one capture session and unbounded within it.
/// `Unique` identities are admitted without being recorded.
#[derive(Debug, Default)]
pub struct DedupGate {
    seen: HashMap<(Severity, i64), Vec<SeenEvent>>,
}

impl DedupGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks and records `identity` in one step. Returns `true` when the
    /// message should be emitted.
    pub fn admit(&mut self, identity: &MessageIdentity) -> bool {
        let MessageIdentity::Event {
            severity,
            timestamp_us,
            source,
        } = identity
        else {
            return true;
        };

        let events = self.seen.entry((*severity, *timestamp_us)).or_default();

        let replayed = matches!(source, EventSource::ProtocolValue { .. })
            && events.iter().any(|e| e.source == *source);
        if replayed {
            return false;
        }

        if let Some(copy) = events
            .iter_mut()
            .find(|e| !e.paired && !e.source.same_channel(source))
        {
            copy.paired = true;
            return false;
        }

        events.push(SeenEvent {
            source: source.clone(),
            paired: false,
        });
        true
    }

    /// Forgets every recorded identity.
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.seen.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
