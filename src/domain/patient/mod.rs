// ============================================================================
// Patient Domain - Business Logic for Patient Aggregate
// ============================================================================
//
// This module contains ALL Patient-specific code:
// - Value objects (PatientId, WardNumber, PatientStatus)
// - Events (Admitted, Transferred, Discharged)
// - Commands (Transfer, Discharge)
// - Errors (PatientError enum)
// - Identity generation (IdGenerator, UuidV7Generator)
// - Aggregate (Patient with business logic)
// - Command Handler (PatientCommandHandler)
//
// This is completely separate from the generic event sourcing infrastructure.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod identity;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use identity::*;
pub use aggregate::*;
pub use command_handler::*;
