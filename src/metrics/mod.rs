use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

// ============================================================================
// Metrics Module - Prometheus metrics for the event store
// ============================================================================
//
// Provides metrics for:
// - Events appended per aggregate type
// - Optimistic concurrency conflicts
// - Aggregates rebuilt by replay
// - Store operation latency
//
// Metrics are registered with a private Prometheus registry and can be
// rendered in the text exposition format with `render`.
// ============================================================================

/// Central metrics registry for the event store
pub struct Metrics {
    registry: Registry,

    pub events_appended: IntCounterVec,
    pub version_conflicts: IntCounterVec,
    pub aggregates_loaded: IntCounterVec,
    pub operation_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events_appended = IntCounterVec::new(
            Opts::new("events_appended_total", "Total events appended to the event store"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(events_appended.clone()))?;

        let version_conflicts = IntCounterVec::new(
            Opts::new("version_conflicts_total", "Appends rejected by optimistic concurrency"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(version_conflicts.clone()))?;

        let aggregates_loaded = IntCounterVec::new(
            Opts::new("aggregates_loaded_total", "Aggregates rebuilt from their event history"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(aggregates_loaded.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("store_operation_duration_seconds", "Event store operation duration")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            registry,
            events_appended,
            version_conflicts,
            aggregates_loaded,
            operation_duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_append(&self, aggregate_type: &str, event_count: usize) {
        self.events_appended
            .with_label_values(&[aggregate_type])
            .inc_by(event_count as u64);
    }

    pub fn record_conflict(&self, aggregate_type: &str) {
        self.version_conflicts.with_label_values(&[aggregate_type]).inc();
    }

    pub fn record_load(&self, aggregate_type: &str) {
        self.aggregates_loaded.with_label_values(&[aggregate_type]).inc();
    }

    pub fn observe_operation(&self, operation: &str, duration_secs: f64) {
        self.operation_duration
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        Ok(encoder.encode_to_string(&self.registry.gather())?)
    }
}
