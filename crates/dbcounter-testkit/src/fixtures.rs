//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use dbcounter::{CoordinatorConfig, PersistenceCoordinator};
use dbcounter_core::{Counter, CounterValue, MemoryCounter};
use dbcounter_store::{MemoryConnector, SqliteConnector};

/// Database name used by fixtures.
pub const TEST_DATABASE: &str = "counter-test-db";

/// Collection name used by fixtures.
pub const TEST_COLLECTION: &str = "counterstest";

/// Coordinator over SQLite with an in-memory counter.
pub type SqliteCoordinator = PersistenceCoordinator<SqliteConnector, MemoryCounter>;

/// Coordinator over the in-memory store with an in-memory counter.
pub type MemoryCoordinator = PersistenceCoordinator<MemoryConnector, MemoryCounter>;

/// A test fixture with a scratch directory and a shared in-memory store.
///
/// Every coordinator built from one fixture points at the same storage, so a
/// second coordinator sees what the first persisted, like a process restart.
pub struct TestFixture {
    dir: TempDir,
    pub store: MemoryConnector,
}

impl TestFixture {
    /// Create a new fixture with an empty scratch directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            store: MemoryConnector::new(),
        }
    }

    /// The scratch directory used as the SQLite endpoint.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Configuration pointing at this fixture's storage.
    pub fn config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_endpoint(self.dir.path())
            .with_database(TEST_DATABASE)
            .with_collection(TEST_COLLECTION)
    }

    /// A SQLite-backed coordinator with a fresh counter.
    pub fn sqlite_coordinator(&self) -> SqliteCoordinator {
        PersistenceCoordinator::sqlite(Arc::new(MemoryCounter::new()), self.config())
            .expect("fixture config is valid")
    }

    /// A coordinator on the shared in-memory store with a fresh counter.
    pub fn memory_coordinator(&self) -> MemoryCoordinator {
        PersistenceCoordinator::new(
            self.store.clone(),
            Arc::new(MemoryCounter::new()),
            self.config(),
        )
        .expect("fixture config is valid")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply every pair to `counter` as an increment.
pub fn seed_counter<K: Counter + ?Sized>(counter: &K, pairs: &[(String, CounterValue)]) {
    for (key, value) in pairs {
        counter.increment(key, *value);
    }
}

/// A counter holding `pairs`.
pub fn counter_with(pairs: &[(String, CounterValue)]) -> Arc<MemoryCounter> {
    let counter = Arc::new(MemoryCounter::new());
    seed_counter(counter.as_ref(), pairs);
    counter
}
