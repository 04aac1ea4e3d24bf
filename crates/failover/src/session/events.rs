//! Session event broadcasting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::{EndpointId, Stream};

/// Something observable happened to a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SlotAdded {
        match_id: String,
        selected: Option<Stream>,
        timestamp: DateTime<Utc>,
    },
    SlotRemoved {
        match_id: String,
        timestamp: DateTime<Utc>,
    },
    /// The selection was changed explicitly.
    StreamChanged {
        match_id: String,
        stream: Stream,
        timestamp: DateTime<Utc>,
    },
    /// A failure moved the slot to another endpoint.
    FailedOver {
        match_id: String,
        from: Option<EndpointId>,
        to: EndpointId,
        timestamp: DateTime<Utc>,
    },
    /// A failure was reported but no other candidate is left.
    Exhausted {
        match_id: String,
        endpoint: Option<EndpointId>,
        timestamp: DateTime<Utc>,
    },
    /// An offline endpoint answered again.
    EndpointRecovered {
        endpoint: EndpointId,
        /// Slots having the endpoint among their candidates.
        match_ids: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Match the event is about, if it concerns a single slot.
    pub fn match_id(&self) -> Option<&str> {
        match self {
            Self::SlotAdded { match_id, .. }
            | Self::SlotRemoved { match_id, .. }
            | Self::StreamChanged { match_id, .. }
            | Self::FailedOver { match_id, .. }
            | Self::Exhausted { match_id, .. } => Some(match_id),
            Self::EndpointRecovered { .. } => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::SlotAdded { timestamp, .. }
            | Self::SlotRemoved { timestamp, .. }
            | Self::StreamChanged { timestamp, .. }
            | Self::FailedOver { timestamp, .. }
            | Self::Exhausted { timestamp, .. }
            | Self::EndpointRecovered { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            Self::SlotAdded {
                match_id, selected, ..
            } => match selected {
                Some(stream) => format!("{match_id}: added with {stream}"),
                None => format!("{match_id}: added without a playable stream"),
            },
            Self::SlotRemoved { match_id, .. } => format!("{match_id}: removed"),
            Self::StreamChanged {
                match_id, stream, ..
            } => format!("{match_id}: switched to {stream}"),
            Self::FailedOver {
                match_id, from, to, ..
            } => match from {
                Some(from) => format!("{match_id}: failed over {from} -> {to}"),
                None => format!("{match_id}: failed over to {to}"),
            },
            Self::Exhausted { match_id, .. } => {
                format!("{match_id}: no alternative stream available")
            }
            Self::EndpointRecovered {
                endpoint,
                match_ids,
                ..
            } => format!("{endpoint}: back online ({})", match_ids.join(", ")),
        }
    }
}

/// Broadcaster for session events.
///
/// Publishing with no subscriber is not an error; the event is dropped.
#[derive(Clone)]
pub(crate) struct SessionEventBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventBroadcaster {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }
}

impl Default for SessionEventBroadcaster {
    fn default() -> Self {
        Self::with_capacity(256)
    }
}
