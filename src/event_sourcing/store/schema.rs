// Table layout for the append-only event log.
//
// UNIQUE(aggregate_id, version) is the optimistic-concurrency anchor: a stale
// writer's insert collides with the row the winner already committed.

pub const CREATE_EVENTS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS events (
        sequence_id     INTEGER PRIMARY KEY AUTOINCREMENT,
        aggregate_id    TEXT NOT NULL,
        aggregate_type  TEXT NOT NULL,
        event_kind      TEXT NOT NULL,
        event_payload   TEXT NOT NULL,
        version         INTEGER NOT NULL,
        recorded_at     TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(aggregate_id, version)
    )
";

pub const INSERT_EVENT: &str = "
    INSERT INTO events (aggregate_id, aggregate_type, event_kind, event_payload, version, recorded_at)
    VALUES (?, ?, ?, ?, ?, ?)
";

pub const SELECT_NEXT_VERSION: &str =
    "SELECT COALESCE(MAX(version) + 1, 0) FROM events WHERE aggregate_id = ?";

pub const SELECT_EVENTS: &str = "
    SELECT sequence_id, aggregate_id, aggregate_type, event_kind, event_payload, version, recorded_at
    FROM events
    WHERE aggregate_id = ?
    ORDER BY version ASC
";

/// Takes the write lock up front so the version check and the inserts see the
/// same snapshot. Competing writers wait on `busy_timeout` instead of failing
/// a lock upgrade.
pub const BEGIN_APPEND: &str = "BEGIN IMMEDIATE";
