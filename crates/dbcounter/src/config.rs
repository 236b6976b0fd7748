//! Coordinator configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CoordinatorError, Result};

/// Interval used when none (or zero) is given.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for a [`crate::PersistenceCoordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Where the store lives. For SQLite, the directory holding database files.
    pub endpoint: PathBuf,
    /// Database name within the store.
    pub database: String,
    /// Collection holding one record per counter key.
    pub collection: String,
    /// Background persistence interval.
    pub interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            endpoint: PathBuf::from("."),
            database: "counters".to_string(),
            collection: "counters".to_string(),
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl CoordinatorConfig {
    /// Set the store endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<PathBuf>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the background persistence interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Check that names are usable.
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(CoordinatorError::InvalidConfig(
                "database name must not be empty".to_string(),
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(CoordinatorError::InvalidConfig(
                "collection name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
