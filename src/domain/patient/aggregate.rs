use crate::event_sourcing::core::Aggregate;
use super::value_objects::{Age, PatientId, PatientName, PatientStatus, WardNumber};
use super::events::*;
use super::commands::PatientCommand;
use super::errors::PatientError;
use super::identity::{IdGenerator, UuidV7Generator};

// ============================================================================
// Patient Aggregate - Business Logic
// ============================================================================
//
// Projected fields are a memoized fold over the event history. They only
// change inside `apply`, which both live commands and replay go through.
//
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patient {
    id: PatientId,
    name: PatientName,
    ward: WardNumber,
    age: Age,
    discharged: bool,

    version: i64,
    pending: Vec<PatientEvent>,
}

impl Patient {
    /// Admit a new patient under a fresh UUIDv7 identity
    pub fn admit(name: PatientName, ward: WardNumber, age: Age) -> Result<Self, PatientError> {
        Self::admit_with(&UuidV7Generator, name, ward, age)
    }

    pub fn admit_with<G: IdGenerator>(
        generator: &G,
        name: PatientName,
        ward: WardNumber,
        age: Age,
    ) -> Result<Self, PatientError> {
        let id = generator.next_id()?;

        let mut patient = Self::default();
        patient.raise(PatientEvent::Admitted(Admitted { id, name, ward, age }));

        tracing::debug!(patient_id = %patient.id, "Admitted patient");
        Ok(patient)
    }

    pub fn transfer(&mut self, new_ward: WardNumber) -> Result<(), PatientError> {
        self.execute(PatientCommand::Transfer { new_ward })
    }

    pub fn discharge(&mut self) -> Result<(), PatientError> {
        self.execute(PatientCommand::Discharge)
    }

    /// Decide on a command and raise the resulting events. A rejected command raises nothing.
    pub fn execute(&mut self, command: PatientCommand) -> Result<(), PatientError> {
        for event in self.handle_command(&command)? {
            self.raise(event);
        }
        Ok(())
    }

    fn raise(&mut self, event: PatientEvent) {
        self.apply(&event);
        self.pending.push(event);
    }

    /// Validate patient can still change state
    fn ensure_active(&self) -> Result<(), PatientError> {
        if self.discharged {
            return Err(PatientError::AlreadyDischarged);
        }
        if self.id.as_str().is_empty() {
            return Err(PatientError::NotAdmitted);
        }
        Ok(())
    }

    pub fn id(&self) -> &PatientId {
        &self.id
    }

    pub fn name(&self) -> &PatientName {
        &self.name
    }

    pub fn ward(&self) -> WardNumber {
        self.ward
    }

    pub fn age(&self) -> Age {
        self.age
    }

    pub fn is_discharged(&self) -> bool {
        self.discharged
    }

    pub fn status(&self) -> PatientStatus {
        if self.discharged {
            PatientStatus::Discharged
        } else {
            PatientStatus::Active
        }
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for Patient {
    type Event = PatientEvent;
    type Command = PatientCommand;
    type Error = PatientError;

    const AGGREGATE_TYPE: &'static str = "Patient";

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PatientEvent::Admitted(e) => {
                self.id = e.id.clone();
                self.name = e.name.clone();
                self.ward = e.ward;
                self.age = e.age;
            }
            PatientEvent::Transferred(e) => {
                self.ward = e.new_ward;
            }
            PatientEvent::Discharged(_) => {
                self.discharged = true;
            }
        }
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        self.ensure_active()?;

        match command {
            PatientCommand::Transfer { new_ward } => {
                Ok(vec![PatientEvent::Transferred(Transferred {
                    id: self.id.clone(),
                    new_ward: *new_ward,
                })])
            }

            PatientCommand::Discharge => {
                Ok(vec![PatientEvent::Discharged(Discharged {
                    id: self.id.clone(),
                })])
            }
        }
    }

    fn aggregate_id(&self) -> &str {
        self.id.as_str()
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn pending_events(&self) -> &[Self::Event] {
        &self.pending
    }

    fn acknowledge_persisted(&mut self, new_version: i64) {
        self.pending.clear();
        self.version = new_version;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
