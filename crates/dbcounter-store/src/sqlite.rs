//! SQLite implementation of the Connector and Session traits.
//!
//! This is the durable storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking. Each database is a separate
//! file under the connector's endpoint directory; collections share one
//! `entries` table.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};

use dbcounter_core::{CounterEntry, EntryId};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{Connector, Session};

/// File extension of database files.
const DB_EXTENSION: &str = "sqlite3";

/// How long a session waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed connector.
///
/// Holds the endpoint directory only. Every [`Connector::connect`] opens a new
/// connection, running migrations on first use of a database file.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    endpoint: PathBuf,
}

impl SqliteConnector {
    /// Create a connector rooted at `endpoint`.
    ///
    /// The directory is created on first connect if it does not exist.
    pub fn new(endpoint: impl AsRef<Path>) -> Self {
        Self {
            endpoint: endpoint.as_ref().to_path_buf(),
        }
    }

    /// The endpoint directory.
    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    /// Path of the file backing `database`.
    pub fn database_path(&self, database: &str) -> PathBuf {
        self.endpoint.join(format!("{}.{}", database, DB_EXTENSION))
    }
}

/// Database names become file names, so keep them to a single path segment.
fn validate_database_name(database: &str) -> Result<()> {
    let valid = !database.is_empty()
        && database != "."
        && database != ".."
        && !database.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidData(format!(
            "invalid database name: {:?}",
            database
        )))
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    type Session = SqliteSession;

    async fn connect(&self, database: &str) -> Result<SqliteSession> {
        validate_database_name(database)?;
        let endpoint = self.endpoint.clone();
        let path = self.database_path(database);

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            std::fs::create_dir_all(&endpoint).map_err(|e| {
                StoreError::Connection(format!("cannot reach {}: {}", endpoint.display(), e))
            })?;
            let mut conn = Connection::open(&path).map_err(|e| {
                StoreError::Connection(format!("cannot open {}: {}", path.display(), e))
            })?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            migration::migrate(&mut conn)?;
            Ok(conn)
        })
        .await
        .map_err(join_error)??;

        tracing::trace!(database, "opened sqlite session");
        Ok(SqliteSession {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// An open connection to one database file.
///
/// The connection closes when the session is dropped.
pub struct SqliteSession {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSession {
    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(join_error)?
    }
}

fn join_error(e: tokio::task::JoinError) -> StoreError {
    StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
        Some(format!("spawn_blocking failed: {}", e)),
    ))
}

fn blob_to_id(idx: usize, bytes: &[u8]) -> rusqlite::Result<EntryId> {
    EntryId::try_from(bytes).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Blob, Box::new(e))
    })
}

/// Read `val`, truncating a REAL written by another producer toward zero.
fn read_val(row: &rusqlite::Row<'_>, key: &str) -> rusqlite::Result<i64> {
    match row.get_ref("val")? {
        ValueRef::Integer(v) => Ok(v),
        ValueRef::Real(f) => {
            tracing::warn!(key, stored = f, "stored value is not an i64, truncating");
            Ok(f as i64)
        }
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            2,
            other.data_type(),
            format!("non-numeric value for key {:?}", key).into(),
        )),
    }
}

// Helper to convert a row to CounterEntry
fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CounterEntry> {
    let id_bytes: Vec<u8> = row.get("id")?;
    let key: String = row.get("key")?;
    Ok(CounterEntry {
        id: Some(blob_to_id(0, &id_bytes)?),
        val: read_val(row, &key)?,
        key,
        val_type: row.get("val_type")?,
    })
}

#[async_trait]
impl Session for SqliteSession {
    async fn find_id_by_key(&self, collection: &str, key: &str) -> Result<Option<EntryId>> {
        let collection = collection.to_string();
        let key = key.to_string();

        self.run(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT id FROM entries WHERE collection = ?1 AND key = ?2",
                    params![collection, key],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(bytes.map(|b| EntryId::try_from(b.as_slice())).transpose()?)
        })
        .await
    }

    async fn find_by_key(&self, collection: &str, key: &str) -> Result<Option<CounterEntry>> {
        let collection = collection.to_string();
        let key = key.to_string();

        self.run(move |conn| {
            conn.query_row(
                "SELECT id, key, val, val_type FROM entries WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                row_to_entry,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn insert(&self, collection: &str, entry: &CounterEntry) -> Result<EntryId> {
        let collection = collection.to_string();
        let entry = entry.clone();

        self.run(move |conn| {
            let id = EntryId::generate();
            let now = now_millis();

            conn.execute(
                "INSERT INTO entries (id, collection, key, val, val_type, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.as_bytes().as_slice(),
                    collection,
                    entry.key,
                    entry.val,
                    entry.val_type,
                    now,
                    now,
                ],
            )?;

            Ok(id)
        })
        .await
    }

    async fn update_value(&self, collection: &str, id: &EntryId, val: i64) -> Result<()> {
        let collection = collection.to_string();
        let id = *id;

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE entries SET val = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2",
                params![collection, id.as_bytes().as_slice(), val, now_millis()],
            )?;

            if changed == 0 {
                return Err(StoreError::NotFound(id.to_hex()));
            }
            Ok(())
        })
        .await
    }

    async fn remove_by_key(&self, collection: &str, key: &str) -> Result<bool> {
        let collection = collection.to_string();
        let key = key.to_string();

        self.run(move |conn| {
            let removed = conn.execute(
                "DELETE FROM entries WHERE collection = ?1 AND key = ?2",
                params![collection, key],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<CounterEntry>> {
        let collection = collection.to_string();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, key, val, val_type FROM entries
                 WHERE collection = ?1
                 ORDER BY rowid",
            )?;

            // One unreadable row must not hide the rest.
            let entries = stmt
                .query_map(params![collection], row_to_entry)?
                .filter_map(|row| match row {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable record");
                        None
                    }
                })
                .collect();

            Ok(entries)
        })
        .await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collection = collection.to_string();

        self.run(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM entries WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
    }
}
