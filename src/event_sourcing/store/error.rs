use std::time::Duration;

// ============================================================================
// Event Store Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// Another writer already holds a version this append tried to claim.
    /// Reload the aggregate and decide again, or give up.
    #[error("Version conflict on aggregate {aggregate_id}: cannot append at version {expected_version}")]
    VersionConflict {
        aggregate_id: String,
        expected_version: i64,
    },

    #[error("Event store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    /// The operation was aborted at its deadline; any open transaction rolled back
    #[error("Event store operation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Failed to encode {kind} event: {source}")]
    Encode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode {kind} event at version {version}: {source}")]
    Decode {
        kind: String,
        version: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown event kind {kind:?} at version {version}")]
    UnknownEventKind { kind: String, version: i64 },
}

impl EventStoreError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    /// I/O failure or deadline; the caller decides whether to try again
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::TimedOut(_))
    }

    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::UnknownEventKind { .. })
    }

    /// Map a failed write, turning a `(aggregate_id, version)` unique violation into a conflict
    pub(crate) fn from_write(error: sqlx::Error, aggregate_id: &str, expected_version: i64) -> Self {
        if let sqlx::Error::Database(db_err) = &error {
            if db_err.is_unique_violation() {
                return Self::VersionConflict {
                    aggregate_id: aggregate_id.to_string(),
                    expected_version,
                };
            }
        }
        Self::StoreUnavailable(error)
    }
}
