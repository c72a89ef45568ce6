use serde::{Deserialize, Serialize};

use crate::event_sourcing::core::{
    DomainEvent, EventDecodeError, deserialize_event, serialize_event,
};
use super::value_objects::{Age, PatientId, PatientName, WardNumber};

// ============================================================================
// Patient Events - Domain Events for Patient Aggregate
// ============================================================================

pub const ADMITTED: &str = "Admitted";
pub const TRANSFERRED: &str = "Transferred";
pub const DISCHARGED: &str = "Discharged";

/// Patient Event - Union type for all patient events
///
/// Not serializable as a whole: the store writes `event_kind()` and
/// `encode_payload()` into separate columns.
#[derive(Debug, Clone, PartialEq)]
pub enum PatientEvent {
    Admitted(Admitted),
    Transferred(Transferred),
    Discharged(Discharged),
}

/// The store keeps the kind in its own column and only the case's fields as payload
impl DomainEvent for PatientEvent {
    fn event_kind(&self) -> &'static str {
        match self {
            PatientEvent::Admitted(_) => ADMITTED,
            PatientEvent::Transferred(_) => TRANSFERRED,
            PatientEvent::Discharged(_) => DISCHARGED,
        }
    }

    fn encode_payload(&self) -> serde_json::Result<String> {
        match self {
            PatientEvent::Admitted(e) => serialize_event(e),
            PatientEvent::Transferred(e) => serialize_event(e),
            PatientEvent::Discharged(e) => serialize_event(e),
        }
    }

    fn decode_payload(kind: &str, payload: &str) -> Result<Self, EventDecodeError> {
        match kind {
            ADMITTED => deserialize_event(kind, payload).map(PatientEvent::Admitted),
            TRANSFERRED => deserialize_event(kind, payload).map(PatientEvent::Transferred),
            DISCHARGED => deserialize_event(kind, payload).map(PatientEvent::Discharged),
            other => Err(EventDecodeError::UnknownKind(other.to_string())),
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Patient Admitted - Initial event in patient lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admitted {
    pub id: PatientId,
    pub name: PatientName,
    pub ward: WardNumber,
    pub age: Age,
}

/// Patient Transferred - Moved to another ward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transferred {
    pub id: PatientId,
    pub new_ward: WardNumber,
}

/// Patient Discharged - Lifecycle ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discharged {
    pub id: PatientId,
}
