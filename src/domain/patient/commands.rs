use super::value_objects::WardNumber;

// ============================================================================
// Patient Commands - Represent user intent
// ============================================================================
//
// Admission is not a command: it mints a new identity and goes through
// `Patient::admit`.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PatientCommand {
    Transfer {
        new_ward: WardNumber,
    },
    Discharge,
}
