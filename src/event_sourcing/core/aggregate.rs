use super::event::DomainEvent;

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// Key Principles:
// 1. State is derived from events (not stored directly)
// 2. Commands are validated before emitting events
// 3. Events represent facts that have already happened
// 4. Aggregates enforce business invariants
// 5. Live and replayed aggregates share one apply path
//
// This is the GENERIC aggregate trait that works for ANY domain aggregate.
//
// ============================================================================

/// Generic Aggregate trait - all event-sourced aggregates implement this
///
/// Type Parameters:
/// - `Event`: The domain event type for this aggregate
/// - `Command`: The command type for this aggregate
/// - `Error`: The error type for business rule violations
///
/// `Default` is the empty aggregate that every replay starts from.
pub trait Aggregate: Default + Sized + Send + Sync {
    type Event: DomainEvent;
    type Command;
    type Error;

    /// Stored in the `aggregate_type` column of every appended row
    const AGGREGATE_TYPE: &'static str;

    /// Fold one event into the projected state. The only place events are interpreted.
    fn apply(&mut self, event: &Self::Event);

    /// Handle command and decide which events to raise (business logic)
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Get aggregate ID
    fn aggregate_id(&self) -> &str;

    /// Number of events already durably persisted
    fn version(&self) -> i64;

    /// Events raised since the last successful append, in raise order
    fn pending_events(&self) -> &[Self::Event];

    /// Clear pending events after the store appended them
    fn acknowledge_persisted(&mut self, new_version: i64);

    /// Rebuild an aggregate from its ordered event history
    fn replay_from<I>(events: I) -> Self
    where
        I: IntoIterator<Item = Self::Event>,
    {
        let mut aggregate = Self::default();
        let mut count = 0i64;

        for event in events {
            aggregate.apply(&event);
            count += 1;
        }

        aggregate.acknowledge_persisted(count);
        aggregate
    }
}
