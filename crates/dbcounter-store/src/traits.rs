//! Connector and Session traits: the abstract interface to a document store.
//!
//! These traits keep the coordinator storage-agnostic. Implementations
//! include SQLite (durable) and in-memory (for tests).

use async_trait::async_trait;
use dbcounter_core::{CounterEntry, EntryId};

use crate::error::Result;

/// Opens sessions against a store endpoint.
///
/// Connectors are cheap, long-lived handles. They hold configuration only;
/// every call to [`Connector::connect`] acquires a fresh session.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The session type produced by this connector.
    type Session: Session;

    /// Open a session on `database`.
    ///
    /// Fails with [`crate::StoreError::Connection`] when the store is
    /// unreachable.
    async fn connect(&self, database: &str) -> Result<Self::Session>;
}

/// An open session on one database.
///
/// Dropping the session releases it.
///
/// # Design Notes
///
/// - **Unique keys**: `insert` does not check for an existing key. Callers
///   that need one record per key call `find_id_by_key` first.
/// - **Absent keys**: lookups return `None` and `remove_by_key` returns
///   `false`; neither is an error.
#[async_trait]
pub trait Session: Send + Sync {
    /// Find the identifier of the record stored under `key`.
    async fn find_id_by_key(&self, collection: &str, key: &str) -> Result<Option<EntryId>>;

    /// Find the full record stored under `key`.
    async fn find_by_key(&self, collection: &str, key: &str) -> Result<Option<CounterEntry>>;

    /// Insert a new record, returning its store-generated identifier.
    ///
    /// Any `id` already set on `entry` is ignored.
    async fn insert(&self, collection: &str, entry: &CounterEntry) -> Result<EntryId>;

    /// Set the `val` field of an existing record, leaving its kind untouched.
    async fn update_value(&self, collection: &str, id: &EntryId, val: i64) -> Result<()>;

    /// Remove the record stored under `key`.
    ///
    /// Returns whether a record was removed.
    async fn remove_by_key(&self, collection: &str, key: &str) -> Result<bool>;

    /// All records in `collection`, in storage order.
    async fn find_all(&self, collection: &str) -> Result<Vec<CounterEntry>>;

    /// Number of records in `collection`.
    async fn count(&self, collection: &str) -> Result<usize>;
}
