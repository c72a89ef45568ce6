use std::sync::Arc;

use crate::event_sourcing::core::Aggregate;
use crate::event_sourcing::store::{EventStore, EventStoreError};
use crate::utils::{retry_on_transient, IsTransient, RetryConfig};

use super::aggregate::Patient;
use super::commands::PatientCommand;
use super::errors::PatientError;
use super::events::PatientEvent;
use super::value_objects::{Age, PatientName, WardNumber};

// ============================================================================
// Patient Command Handler
// ============================================================================
//
// Orchestrates: Load → Aggregate → Events → Event Store
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Domain(#[from] PatientError),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

/// Only a lost optimistic-concurrency race is worth recomputing
impl IsTransient for CommandError {
    fn is_transient(&self) -> bool {
        matches!(self, CommandError::Store(e) if e.is_version_conflict())
    }
}

pub struct PatientCommandHandler {
    event_store: Arc<EventStore<PatientEvent>>,
}

impl PatientCommandHandler {
    pub fn new(event_store: Arc<EventStore<PatientEvent>>) -> Self {
        Self { event_store }
    }

    /// Admit a patient and persist the admission
    pub async fn admit(
        &self,
        name: PatientName,
        ward: WardNumber,
        age: Age,
    ) -> Result<Patient, CommandError> {
        let mut patient = Patient::admit(name, ward, age)?;
        self.event_store.save(&mut patient).await?;
        Ok(patient)
    }

    /// Handle a command against the stored patient and persist resulting events
    ///
    /// Returns the patient's version after the append.
    pub async fn handle(
        &self,
        patient_id: &str,
        command: PatientCommand,
    ) -> Result<i64, CommandError> {
        let mut patient: Patient = self.event_store.load(patient_id).await?;

        patient.execute(command)?;
        self.event_store.save(&mut patient).await?;

        Ok(patient.version())
    }

    /// Like `handle`, but reloads and decides again when another writer got there first
    pub async fn handle_with_retry(
        &self,
        patient_id: &str,
        command: PatientCommand,
        config: RetryConfig,
    ) -> Result<i64, CommandError> {
        retry_on_transient(config, patient_id, move |attempt| {
            tracing::debug!(patient_id = %patient_id, attempt = attempt, "Handling patient command");
            self.handle(patient_id, command.clone())
        })
        .await
        .into_result()
    }
}
