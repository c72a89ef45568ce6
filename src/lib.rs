// ============================================================================
// Event-Sourced Patient Records
// ============================================================================
//
// - event_sourcing/ - generic aggregate trait and SQLite event store
// - domain/         - the Patient aggregate, its events and command handler
// - config          - event store connection settings
// - metrics         - Prometheus metrics for store operations
// - utils           - caller-side retry helpers
//
// ============================================================================

pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;
pub mod utils;
