use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

// ============================================================================
// Recorded Event - One Persisted Row of an Event Stream
// ============================================================================
//
// Wraps a decoded domain event with the metadata the store keeps per row.
// This is GENERIC and works with ANY event type.
//
// ============================================================================

/// A domain event as it was read back from the event store
///
/// Type Parameter:
/// - `E`: The domain event type (must implement DomainEvent trait)
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEvent<E> {
    // Row Identity
    pub sequence_id: i64,
    pub aggregate_id: String,
    pub aggregate_type: String,

    // Stream Position
    pub version: i64,

    // Event Type Information
    pub event_kind: String,

    // Event Payload
    pub event: E,

    // Timing
    pub recorded_at: DateTime<Utc>,
}

impl<E> RecordedEvent<E> {
    /// Drop the row metadata and keep only the domain event
    pub fn into_event(self) -> E {
        self.event
    }
}

// ============================================================================
// Domain Event Trait
// ============================================================================

/// Why a stored payload could not be turned back into a domain event
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("unknown event kind: {0}")]
    UnknownKind(String),

    #[error("malformed {kind} payload: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Generic Domain Event trait
///
/// All domain events must implement this trait to be used with the event store.
/// An event is persisted as a kind tag plus a payload holding exactly one case.
pub trait DomainEvent: Clone + Send + Sync + Sized {
    /// Stable name of this event case, stored in the `event_kind` column
    fn event_kind(&self) -> &'static str;

    /// Encode this event case's fields, without the kind tag
    fn encode_payload(&self) -> serde_json::Result<String>;

    /// Rebuild the event case named by `kind` from its payload
    fn decode_payload(kind: &str, payload: &str) -> Result<Self, EventDecodeError>;
}

// ============================================================================
// Event Serialization Helpers
// ============================================================================

pub fn serialize_event<E: Serialize>(event: &E) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

/// Decode a payload for a known kind, tagging failures with that kind
pub fn deserialize_event<E: for<'de> Deserialize<'de>>(
    kind: &str,
    json: &str,
) -> Result<E, EventDecodeError> {
    serde_json::from_str(json).map_err(|source| EventDecodeError::Malformed {
        kind: kind.to_string(),
        source,
    })
}

// ============================================================================
// Tests
// ============================================================================
