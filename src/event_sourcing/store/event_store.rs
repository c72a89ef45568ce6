use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::config::StoreConfig;
use crate::event_sourcing::core::{Aggregate, DomainEvent, EventDecodeError, RecordedEvent};
use crate::metrics::Metrics;

use super::error::EventStoreError;
use super::schema;

// ============================================================================
// Generic Event Store - Repository for Events
// ============================================================================
//
// This is a GENERIC event store that works with ANY event type.
//
// Type Parameter:
// - `E`: The domain event type (must implement DomainEvent trait)
//
// Responsibilities:
// 1. Append events to the events table (append-only, all-or-nothing)
// 2. Load event history for aggregates, ordered by version
// 3. Ensure optimistic concurrency control via UNIQUE(aggregate_id, version)
//
// The pool is owned by the store instance: opened in `connect`, released in
// `close`. Every operation runs under `operation_timeout`; dropping the
// returned future also aborts the I/O.
//
// ============================================================================

pub struct EventStore<E: DomainEvent> {
    pool: SqlitePool,
    operation_timeout: Duration,
    metrics: Option<Arc<Metrics>>,
    _phantom: PhantomData<E>,
}

impl<E: DomainEvent> EventStore<E> {
    /// Open a pool from configuration and make sure the events table exists
    pub async fn connect(config: &StoreConfig) -> Result<Self, EventStoreError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(config.create_if_missing)
            .busy_timeout(config.operation_timeout);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.operation_timeout);

        // Each connection to `:memory:` is its own database; keep exactly one alive
        if config.is_in_memory() {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = pool_options.connect_with(options).await?;

        tracing::info!(
            database_url = %config.database_url,
            max_connections = config.max_connections,
            "Connected to event store"
        );

        let store = Self::new(pool, config.operation_timeout);
        store.init_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool. Call `init_schema` before first use.
    pub fn new(pool: SqlitePool, operation_timeout: Duration) -> Self {
        Self {
            pool,
            operation_timeout,
            metrics: None,
            _phantom: PhantomData,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn init_schema(&self) -> Result<(), EventStoreError> {
        self.timed("init_schema", async {
            sqlx::query(schema::CREATE_EVENTS_TABLE).execute(&self.pool).await?;
            Ok::<_, EventStoreError>(())
        })
        .await
    }

    /// Close every pooled connection
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Append events to the event store
    ///
    /// Rows get versions `expected_start_version, expected_start_version + 1, ...`
    /// inside one transaction. Returns the version after the last appended event.
    pub async fn append(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
        events: &[E],
        expected_start_version: i64,
    ) -> Result<i64, EventStoreError> {
        if events.is_empty() {
            return Ok(expected_start_version);
        }

        // Encode before touching the database so a bad payload never opens a transaction
        let encoded = events
            .iter()
            .map(|event| {
                let kind = event.event_kind();
                event
                    .encode_payload()
                    .map(|payload| (kind, payload))
                    .map_err(|source| EventStoreError::Encode {
                        kind: kind.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = self
            .timed(
                "append",
                self.append_rows(aggregate_id, aggregate_type, &encoded, expected_start_version),
            )
            .await;

        match &result {
            Ok(new_version) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_append(aggregate_type, encoded.len());
                }
                tracing::info!(
                    aggregate_id = %aggregate_id,
                    aggregate_type = %aggregate_type,
                    new_version = new_version,
                    event_count = encoded.len(),
                    "Appended events to event store"
                );
            }
            Err(EventStoreError::VersionConflict { .. }) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_conflict(aggregate_type);
                }
                tracing::warn!(
                    aggregate_id = %aggregate_id,
                    expected_version = expected_start_version,
                    "Append rejected by version conflict"
                );
            }
            Err(_) => {}
        }

        result
    }

    async fn append_rows(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
        encoded: &[(&'static str, String)],
        expected_start_version: i64,
    ) -> Result<i64, EventStoreError> {
        // Dropping `tx` on any early return rolls the whole append back
        let mut tx = self.pool.begin_with(schema::BEGIN_APPEND).await?;

        let next_version = sqlx::query_scalar::<_, i64>(schema::SELECT_NEXT_VERSION)
            .bind(aggregate_id)
            .fetch_one(&mut *tx)
            .await?;

        // Rejects stale writers and gaps alike; the unique index is the backstop
        if next_version != expected_start_version {
            return Err(EventStoreError::VersionConflict {
                aggregate_id: aggregate_id.to_string(),
                expected_version: expected_start_version,
            });
        }

        let recorded_at = Utc::now();
        let mut version = expected_start_version;

        for (kind, payload) in encoded {
            sqlx::query(schema::INSERT_EVENT)
                .bind(aggregate_id)
                .bind(aggregate_type)
                .bind(*kind)
                .bind(payload.as_str())
                .bind(version)
                .bind(recorded_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| EventStoreError::from_write(e, aggregate_id, expected_start_version))?;
            version += 1;
        }

        tx.commit()
            .await
            .map_err(|e| EventStoreError::from_write(e, aggregate_id, expected_start_version))?;

        Ok(version)
    }

    /// Persist an aggregate's pending events and mark them persisted
    pub async fn save<A>(&self, aggregate: &mut A) -> Result<(), EventStoreError>
    where
        A: Aggregate<Event = E>,
    {
        if aggregate.pending_events().is_empty() {
            return Ok(());
        }

        let new_version = self
            .append(
                aggregate.aggregate_id(),
                A::AGGREGATE_TYPE,
                aggregate.pending_events(),
                aggregate.version(),
            )
            .await?;

        aggregate.acknowledge_persisted(new_version);
        Ok(())
    }

    /// Load all events for an aggregate, ordered by version
    pub async fn load_events(
        &self,
        aggregate_id: &str,
    ) -> Result<Vec<RecordedEvent<E>>, EventStoreError> {
        let rows = self
            .timed("load", async {
                let rows = sqlx::query(schema::SELECT_EVENTS)
                    .bind(aggregate_id)
                    .fetch_all(&self.pool)
                    .await?;
                Ok::<_, EventStoreError>(rows)
            })
            .await?;

        let mut events = Vec::with_capacity(rows.len());

        for row in rows {
            let event_kind: String = row.try_get("event_kind")?;
            let payload: String = row.try_get("event_payload")?;
            let version: i64 = row.try_get("version")?;

            let event = E::decode_payload(&event_kind, &payload).map_err(|e| match e {
                EventDecodeError::UnknownKind(kind) => {
                    EventStoreError::UnknownEventKind { kind, version }
                }
                EventDecodeError::Malformed { kind, source } => {
                    EventStoreError::Decode { kind, version, source }
                }
            })?;

            let recorded_at: DateTime<Utc> = row.try_get("recorded_at")?;

            events.push(RecordedEvent {
                sequence_id: row.try_get("sequence_id")?,
                aggregate_id: row.try_get("aggregate_id")?,
                aggregate_type: row.try_get("aggregate_type")?,
                version,
                event_kind,
                event,
                recorded_at,
            });
        }

        tracing::debug!(
            aggregate_id = %aggregate_id,
            event_count = events.len(),
            "Loaded events for aggregate"
        );
        Ok(events)
    }

    /// Load aggregate from events
    ///
    /// An aggregate with no stored events comes back empty at version 0.
    pub async fn load<A>(&self, aggregate_id: &str) -> Result<A, EventStoreError>
    where
        A: Aggregate<Event = E>,
    {
        let events = self.load_events(aggregate_id).await?;

        if let Some(metrics) = &self.metrics {
            metrics.record_load(A::AGGREGATE_TYPE);
        }

        Ok(A::replay_from(events.into_iter().map(RecordedEvent::into_event)))
    }

    /// Version the next append must start at (the number of stored events)
    pub async fn current_version(&self, aggregate_id: &str) -> Result<i64, EventStoreError> {
        self.timed("current_version", async {
            let next_version = sqlx::query_scalar::<_, i64>(schema::SELECT_NEXT_VERSION)
                .bind(aggregate_id)
                .fetch_one(&self.pool)
                .await?;
            Ok::<_, EventStoreError>(next_version)
        })
        .await
    }

    /// Check if aggregate exists
    pub async fn aggregate_exists(&self, aggregate_id: &str) -> Result<bool, EventStoreError> {
        let version = self.current_version(aggregate_id).await?;
        Ok(version > 0)
    }

    async fn timed<T, F>(&self, operation: &'static str, future: F) -> Result<T, EventStoreError>
    where
        F: Future<Output = Result<T, EventStoreError>>,
    {
        let started = Instant::now();

        let result = match tokio::time::timeout(self.operation_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(EventStoreError::TimedOut(self.operation_timeout)),
        };

        if let Some(metrics) = &self.metrics {
            metrics.observe_operation(operation, started.elapsed().as_secs_f64());
        }

        result
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::{
        Admitted, Age, Patient, PatientError, PatientEvent, PatientId, PatientName, WardNumber,
    };

    async fn test_store() -> EventStore<PatientEvent> {
        EventStore::connect(&StoreConfig::default()).await.unwrap()
    }

    fn admitted(id: &str) -> PatientEvent {
        PatientEvent::Admitted(Admitted {
            id: PatientId::new(id),
            name: PatientName::new("Ada Lovelace"),
            ward: WardNumber(1),
            age: Age(36),
        })
    }

    async fn versions(store: &EventStore<PatientEvent>, id: &str) -> Vec<i64> {
        store
            .load_events(id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.version)
            .collect()
    }

    async fn insert_raw(store: &EventStore<PatientEvent>, id: &str, kind: &str, payload: &str) {
        sqlx::query(schema::INSERT_EVENT)
            .bind(id)
            .bind("Patient")
            .bind(kind)
            .bind(payload)
            .bind(0i64)
            .bind(Utc::now())
            .execute(&store.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_richard_hagen_scenario() {
        let store = test_store().await;

        let mut patient = Patient::admit(
            PatientName::new("Richard Hagen"),
            WardNumber(1),
            Age(35),
        )
        .unwrap();
        patient.transfer(WardNumber(2)).unwrap();
        patient.transfer(WardNumber(3)).unwrap();

        store.save(&mut patient).await.unwrap();
        assert_eq!(patient.version(), 3);
        assert!(patient.pending_events().is_empty());

        patient.discharge().unwrap();
        assert_eq!(patient.version(), 3);
        assert!(patient.is_discharged());
        assert_eq!(patient.pending_events().len(), 1);

        let result = patient.transfer(WardNumber(4));
        assert!(matches!(result, Err(PatientError::AlreadyDischarged)));
        assert_eq!(patient.ward(), WardNumber(3));

        store.save(&mut patient).await.unwrap();

        let recorded = store.load_events(patient.id().as_str()).await.unwrap();
        assert_eq!(recorded.len(), 4);
        assert_eq!(recorded[3].version, 3);
        assert_eq!(recorded[3].event_kind, "Discharged");
        assert_eq!(recorded[3].aggregate_type, "Patient");

        let reloaded: Patient = store.load(patient.id().as_str()).await.unwrap();
        assert_eq!(reloaded.name().as_str(), "Richard Hagen");
        assert_eq!(reloaded.ward(), WardNumber(3));
        assert_eq!(reloaded.age(), Age(35));
        assert!(reloaded.is_discharged());
        assert_eq!(reloaded.version(), 4);
    }

    #[tokio::test]
    async fn test_versions_stay_contiguous_across_appends() {
        let store = test_store().await;
        let mut patient =
            Patient::admit(PatientName::new("Grace Hopper"), WardNumber(5), Age(40)).unwrap();

        store.save(&mut patient).await.unwrap();
        patient.transfer(WardNumber(6)).unwrap();
        patient.transfer(WardNumber(7)).unwrap();
        store.save(&mut patient).await.unwrap();
        patient.discharge().unwrap();
        store.save(&mut patient).await.unwrap();

        assert_eq!(versions(&store, patient.id().as_str()).await, vec![0, 1, 2, 3]);
        assert_eq!(store.current_version(patient.id().as_str()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_stale_writer_gets_version_conflict() {
        let store = test_store().await;
        let mut patient =
            Patient::admit(PatientName::new("Alan Turing"), WardNumber(1), Age(41)).unwrap();
        store.save(&mut patient).await.unwrap();
        let id = patient.id().as_str().to_string();

        let mut first: Patient = store.load(&id).await.unwrap();
        let mut second: Patient = store.load(&id).await.unwrap();

        first.transfer(WardNumber(2)).unwrap();
        second.transfer(WardNumber(9)).unwrap();
        second.discharge().unwrap();

        store.save(&mut first).await.unwrap();
        let result = store.save(&mut second).await;

        match result {
            Err(EventStoreError::VersionConflict { aggregate_id, expected_version }) => {
                assert_eq!(aggregate_id, id);
                assert_eq!(expected_version, 1);
            }
            other => panic!("expected VersionConflict, got {:?}", other),
        }

        // The loser keeps its pending events and the store holds only the winner's
        assert_eq!(second.pending_events().len(), 2);
        assert_eq!(second.version(), 1);
        assert_eq!(versions(&store, &id).await, vec![0, 1]);

        let current: Patient = store.load(&id).await.unwrap();
        assert_eq!(current.ward(), WardNumber(2));
        assert!(!current.is_discharged());
    }

    #[tokio::test]
    async fn test_unique_constraint_rejects_duplicate_version() {
        let store = test_store().await;
        insert_raw(&store, "p-dup", "Admitted", &admitted("p-dup").encode_payload().unwrap()).await;

        let result = sqlx::query(schema::INSERT_EVENT)
            .bind("p-dup")
            .bind("Patient")
            .bind("Discharged")
            .bind("{\"id\":\"p-dup\"}")
            .bind(0i64)
            .bind(Utc::now())
            .execute(&store.pool)
            .await
            .map_err(|e| EventStoreError::from_write(e, "p-dup", 0));

        assert!(matches!(result, Err(EventStoreError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_append_ahead_of_stream_is_rejected() {
        let store = test_store().await;

        let result = store.append("p-gap", "Patient", &[admitted("p-gap")], 2).await;

        assert!(result.unwrap_err().is_version_conflict());
        assert!(!store.aggregate_exists("p-gap").await.unwrap());
    }

    #[tokio::test]
    async fn test_append_returns_new_version() {
        let store = test_store().await;

        let new_version = store
            .append("p-1", "Patient", &[admitted("p-1")], 0)
            .await
            .unwrap();
        assert_eq!(new_version, 1);

        let unchanged = store.append("p-1", "Patient", &[], 1).await.unwrap();
        assert_eq!(unchanged, 1);
        assert_eq!(store.current_version("p-1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_load_unknown_aggregate_is_empty() {
        let store = test_store().await;

        let patient: Patient = store.load("never-admitted").await.unwrap();

        assert_eq!(patient.version(), 0);
        assert!(patient.pending_events().is_empty());
        assert_eq!(patient.id().as_str(), "");
        assert!(!store.aggregate_exists("never-admitted").await.unwrap());
    }

    #[tokio::test]
    async fn test_load_twice_is_identical() {
        let store = test_store().await;
        let mut patient =
            Patient::admit(PatientName::new("Emmy Noether"), WardNumber(3), Age(53)).unwrap();
        patient.transfer(WardNumber(8)).unwrap();
        store.save(&mut patient).await.unwrap();

        let first: Patient = store.load(patient.id().as_str()).await.unwrap();
        let second: Patient = store.load(patient.id().as_str()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, patient);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_decode_error() {
        let store = test_store().await;
        insert_raw(&store, "p-bad", "Admitted", "{\"id\": \"p-bad\"}").await;

        let result = store.load::<Patient>("p-bad").await;

        match result {
            Err(EventStoreError::Decode { kind, version, .. }) => {
                assert_eq!(kind, "Admitted");
                assert_eq!(version, 0);
            }
            other => panic!("expected Decode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_event_kind_is_rejected() {
        let store = test_store().await;
        insert_raw(&store, "p-new", "Readmitted", "{\"id\": \"p-new\"}").await;

        let result = store.load::<Patient>("p-new").await;

        assert!(matches!(
            result,
            Err(EventStoreError::UnknownEventKind { ref kind, version: 0 }) if kind == "Readmitted"
        ));
    }

    #[tokio::test]
    async fn test_aggregates_are_isolated() {
        let store = test_store().await;
        let mut a = Patient::admit(PatientName::new("A"), WardNumber(1), Age(20)).unwrap();
        let mut b = Patient::admit(PatientName::new("B"), WardNumber(2), Age(30)).unwrap();
        b.transfer(WardNumber(4)).unwrap();

        store.save(&mut a).await.unwrap();
        store.save(&mut b).await.unwrap();

        assert_eq!(versions(&store, a.id().as_str()).await, vec![0]);
        assert_eq!(versions(&store, b.id().as_str()).await, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_metrics_are_recorded() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let store = test_store().await.with_metrics(metrics.clone());

        store.append("p-m", "Patient", &[admitted("p-m")], 0).await.unwrap();
        let _ = store.append("p-m", "Patient", &[admitted("p-m")], 0).await;
        let _: Patient = store.load("p-m").await.unwrap();

        assert_eq!(metrics.events_appended.with_label_values(&["Patient"]).get(), 1);
        assert_eq!(metrics.version_conflicts.with_label_values(&["Patient"]).get(), 1);
        assert_eq!(metrics.aggregates_loaded.with_label_values(&["Patient"]).get(), 1);
    }

    #[tokio::test]
    async fn test_operation_past_deadline_times_out() {
        let store = test_store().await;
        let impatient: EventStore<PatientEvent> = EventStore::new(store.pool.clone(), Duration::ZERO);

        let result = impatient.load_events("p-slow").await;

        match result {
            Err(error @ EventStoreError::TimedOut(_)) => assert!(error.is_store_unavailable()),
            other => panic!("expected TimedOut, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable() {
        let store = test_store().await;
        let pool = store.pool.clone();
        store.close().await;

        let reopened: EventStore<PatientEvent> = EventStore::new(pool, Duration::from_secs(1));
        let result = reopened.current_version("p-1").await;

        assert!(result.unwrap_err().is_store_unavailable());
    }

    async fn file_store(dir: &tempfile::TempDir, max_connections: u32) -> EventStore<PatientEvent> {
        let url = format!("sqlite://{}", dir.path().join("events.db").display());
        let config = StoreConfig::new(url).with_max_connections(max_connections);
        EventStore::connect(&config).await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_writers_on_shared_file_get_version_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(file_store(&dir, 8).await);

        for round in 0..20 {
            let id = format!("p-race-{round}");
            let mut writers = tokio::task::JoinSet::new();

            for _ in 0..6 {
                let store = store.clone();
                let id = id.clone();
                writers.spawn(async move { store.append(&id, "Patient", &[admitted(&id)], 0).await });
            }

            let mut winners = 0;
            while let Some(joined) = writers.join_next().await {
                match joined.unwrap() {
                    Ok(new_version) => {
                        assert_eq!(new_version, 1);
                        winners += 1;
                    }
                    Err(EventStoreError::VersionConflict { expected_version, .. }) => {
                        assert_eq!(expected_version, 0);
                    }
                    Err(other) => panic!("expected VersionConflict, got {:?}", other),
                }
            }

            assert_eq!(winners, 1);
            assert_eq!(versions(&store, &id).await, vec![0]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_that_reload_stay_contiguous() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(file_store(&dir, 8).await);
        store.append("p-busy", "Patient", &[admitted("p-busy")], 0).await.unwrap();

        let mut writers = tokio::task::JoinSet::new();
        for ward in 2..10 {
            let store = store.clone();
            writers.spawn(async move {
                loop {
                    let mut patient: Patient = store.load("p-busy").await.unwrap();
                    patient.transfer(WardNumber(ward)).unwrap();
                    match store.save(&mut patient).await {
                        Ok(()) => return patient.version(),
                        Err(EventStoreError::VersionConflict { .. }) => continue,
                        Err(other) => panic!("expected VersionConflict, got {:?}", other),
                    }
                }
            });
        }

        let mut saved_versions = Vec::new();
        while let Some(joined) = writers.join_next().await {
            saved_versions.push(joined.unwrap());
        }
        saved_versions.sort_unstable();

        assert_eq!(saved_versions, (2..10).collect::<Vec<i64>>());
        assert_eq!(versions(&store, "p-busy").await, (0..9).collect::<Vec<i64>>());
    }
}
