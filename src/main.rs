use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use patient_es::config::StoreConfig;
use patient_es::domain::patient::{Age, Patient, PatientEvent, PatientName, WardNumber};
use patient_es::event_sourcing::{Aggregate, EventStore};
use patient_es::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,patient_es=debug"))
        )
        .init();

    // === 1. Open the event store ===
    let config = StoreConfig::from_env()?;
    let metrics = Arc::new(Metrics::new()?);
    let store = EventStore::<PatientEvent>::connect(&config)
        .await?
        .with_metrics(metrics.clone());

    // === 2. Admit and move a patient in memory ===
    let mut patient = Patient::admit(
        PatientName::new("Richard Hagen"),
        WardNumber(1),
        Age(35),
    )?;
    patient.transfer(WardNumber(2))?;
    patient.transfer(WardNumber(3))?;

    // === 3. Persist the first three events ===
    store.save(&mut patient).await?;
    tracing::info!(patient_id = %patient.id(), version = patient.version(), "Saved patient");

    // === 4. Discharge; later commands are rejected ===
    patient.discharge()?;
    if let Err(e) = patient.transfer(WardNumber(4)) {
        tracing::warn!(patient_id = %patient.id(), error = %e, "Transfer rejected");
    }

    store.save(&mut patient).await?;

    // === 5. Rebuild from history ===
    let reloaded: Patient = store.load(patient.id().as_str()).await?;
    tracing::info!(
        patient_id = %reloaded.id(),
        name = reloaded.name().as_str(),
        ward = reloaded.ward().0,
        age = reloaded.age().0,
        discharged = reloaded.is_discharged(),
        version = reloaded.version(),
        "Reloaded patient from event store"
    );

    tracing::debug!("Store metrics:\n{}", metrics.render()?);

    store.close().await;
    Ok(())
}
