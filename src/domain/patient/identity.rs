use uuid::Uuid;

use super::errors::PatientError;
use super::value_objects::PatientId;

/// Source of new patient identities.
///
/// Identities must be globally unique and sort lexicographically by creation time.
pub trait IdGenerator {
    fn next_id(&self) -> Result<PatientId, PatientError>;
}

/// Hyphenated UUIDv7: a millisecond timestamp prefix followed by random bits
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn next_id(&self) -> Result<PatientId, PatientError> {
        Ok(PatientId(Uuid::now_v7().to_string()))
    }
}
