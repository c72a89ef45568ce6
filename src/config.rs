use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Event Store Configuration
// ============================================================================
//
// Connection settings for the SQLite-backed event store. Defaults give a
// private in-memory database; `from_env` overrides them from the process
// environment.
//
// ============================================================================

pub const ENV_DATABASE_URL: &str = "PATIENT_STORE_URL";
pub const ENV_MAX_CONNECTIONS: &str = "PATIENT_STORE_MAX_CONNECTIONS";
pub const ENV_TIMEOUT_MS: &str = "PATIENT_STORE_TIMEOUT_MS";

const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
const DEFAULT_MAX_CONNECTIONS: u32 = 1;
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Event store connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite URL (e.g., "sqlite://patients.db" or "sqlite::memory:")
    pub database_url: String,

    /// Upper bound on pooled connections. In-memory databases always use one.
    pub max_connections: u32,

    /// Deadline for a single store operation, after which it is aborted
    pub operation_timeout: Duration,

    /// Create the database file when it does not exist yet
    pub create_if_missing: bool,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    pub fn with_create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    /// Build a configuration from `PATIENT_STORE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_DATABASE_URL) {
            config.database_url = url;
        }

        if let Some(raw) = lookup(ENV_MAX_CONNECTIONS) {
            config.max_connections = parse_positive(ENV_MAX_CONNECTIONS, &raw)? as u32;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            config.operation_timeout = Duration::from_millis(parse_positive(ENV_TIMEOUT_MS, &raw)?);
        }

        Ok(config)
    }

    /// SQLite in-memory databases live and die with their connection
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(u64::from(value)),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        }),
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            create_if_missing: true,
        }
    }
}
