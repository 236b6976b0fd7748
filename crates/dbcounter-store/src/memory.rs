//! In-memory implementation of the Connector and Session traits.
//!
//! This is primarily for testing. Records are kept as JSON documents, so the
//! numeric value loses its kind exactly as it would in a real document store.
//! Connectivity can be switched off to exercise failure paths.
//!
//! Every operation yields to the scheduler once before touching the data,
//! standing in for a network round trip, so concurrent callers interleave
//! between operations even on a single-threaded runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use dbcounter_core::{CounterEntry, EntryId};

use crate::error::{Result, StoreError};
use crate::schema::{ID_FIELD, KEY_FIELD, VAL_FIELD, VAL_TYPE_FIELD};
use crate::traits::{Connector, Session};

/// Documents of one collection, in insertion order.
type Collection = Vec<Value>;

struct MemoryState {
    /// database -> collection -> documents.
    databases: RwLock<HashMap<String, HashMap<String, Collection>>>,

    /// Whether the store currently accepts connections and operations.
    available: AtomicBool,

    /// Remaining writes before the store starts failing them.
    write_budget: AtomicUsize,

    /// Number of sessions opened so far.
    sessions_opened: AtomicUsize,
}

/// In-memory document store.
///
/// Clones share the same underlying data, like several clients of one server.
/// All data is lost when the last clone is dropped.
#[derive(Clone)]
pub struct MemoryConnector {
    state: Arc<MemoryState>,
}

impl MemoryConnector {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(MemoryState {
                databases: RwLock::new(HashMap::new()),
                available: AtomicBool::new(true),
                write_budget: AtomicUsize::new(usize::MAX),
                sessions_opened: AtomicUsize::new(0),
            }),
        }
    }

    /// Simulate the store going offline (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.state.available.store(available, Ordering::SeqCst);
    }

    /// Let the next `n` writes succeed, then fail every write after them.
    pub fn fail_writes_after(&self, n: usize) {
        self.state.write_budget.store(n, Ordering::SeqCst);
    }

    /// Stop failing writes.
    pub fn reset_faults(&self) {
        self.state.write_budget.store(usize::MAX, Ordering::SeqCst);
        self.state.available.store(true, Ordering::SeqCst);
    }

    /// Number of sessions opened since creation.
    pub fn sessions_opened(&self) -> usize {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    /// Raw documents of a collection, for inspection in tests.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Value> {
        let databases = self.state.databases.read().unwrap_or_else(PoisonError::into_inner);
        databases
            .get(database)
            .and_then(|db| db.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    /// Insert a raw document, bypassing the typed API.
    ///
    /// Useful for seeding records the typed API would never write.
    pub fn insert_document(&self, database: &str, collection: &str, document: Value) {
        let mut databases = self.state.databases.write().unwrap_or_else(PoisonError::into_inner);
        databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn connect(&self, database: &str) -> Result<MemorySession> {
        tokio::task::yield_now().await;
        self.state.check_available()?;
        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            database: database.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}

impl MemoryState {
    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Connection("memory store is offline".to_string()))
        }
    }

    fn consume_write(&self) -> Result<()> {
        self.check_available()?;
        self.write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .map(|_| ())
            .map_err(|_| StoreError::Connection("memory store rejected write".to_string()))
    }
}

/// A session on one database of a [`MemoryConnector`].
pub struct MemorySession {
    database: String,
    state: Arc<MemoryState>,
}

impl MemorySession {
    async fn read<T>(&self, collection: &str, f: impl FnOnce(&[Value]) -> T) -> Result<T> {
        tokio::task::yield_now().await;
        self.state.check_available()?;
        let databases = self.state.databases.read().unwrap_or_else(PoisonError::into_inner);
        let docs = databases
            .get(&self.database)
            .and_then(|db| db.get(collection))
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(f(docs))
    }

    async fn write<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Collection) -> Result<T>,
    ) -> Result<T> {
        tokio::task::yield_now().await;
        self.state.consume_write()?;
        let mut databases = self.state.databases.write().unwrap_or_else(PoisonError::into_inner);
        let docs = databases
            .entry(self.database.clone())
            .or_default()
            .entry(collection.to_string())
            .or_default();
        f(docs)
    }
}

fn has_key(doc: &Value, key: &str) -> bool {
    doc.get(KEY_FIELD).and_then(Value::as_str) == Some(key)
}

fn has_id(doc: &Value, id: &EntryId) -> bool {
    doc.get(ID_FIELD).and_then(Value::as_str) == Some(id.to_hex().as_str())
}

/// Coerce a non-integer numeric `val` to `i64`, truncating toward zero.
///
/// Other writers may store floats or unsigned values. Non-numeric values are
/// left alone and fail to decode.
fn normalize_val(doc: &mut Value) {
    let Some(val) = doc.get(VAL_FIELD) else {
        return;
    };
    if val.is_i64() {
        return;
    }
    let coerced = match (val.as_u64(), val.as_f64()) {
        (Some(u), _) => i64::try_from(u).unwrap_or(i64::MAX),
        (None, Some(f)) => f as i64,
        (None, None) => return,
    };

    tracing::warn!(
        key = ?doc.get(KEY_FIELD),
        val_type = ?doc.get(VAL_TYPE_FIELD),
        stored = %val,
        coerced,
        "stored value is not an i64, truncating"
    );
    doc[VAL_FIELD] = Value::from(coerced);
}

/// Decode a document, logging and skipping it if it is unreadable.
fn decode_doc(mut doc: Value) -> Option<CounterEntry> {
    normalize_val(&mut doc);
    match serde_json::from_value::<CounterEntry>(doc) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!(error = %e, "skipping unreadable record");
            None
        }
    }
}

fn doc_id(doc: &Value) -> Result<EntryId> {
    let hex = doc
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::InvalidData(format!("document without {}", ID_FIELD)))?;
    Ok(EntryId::from_hex(hex)?)
}

#[async_trait]
impl Session for MemorySession {
    async fn find_id_by_key(&self, collection: &str, key: &str) -> Result<Option<EntryId>> {
        self.read(collection, |docs| docs.iter().find(|d| has_key(d, key)).map(doc_id))
            .await?
            .transpose()
    }

    async fn find_by_key(&self, collection: &str, key: &str) -> Result<Option<CounterEntry>> {
        let doc = self
            .read(collection, |docs| docs.iter().find(|d| has_key(d, key)).cloned())
            .await?;
        Ok(doc.and_then(decode_doc))
    }

    async fn insert(&self, collection: &str, entry: &CounterEntry) -> Result<EntryId> {
        let id = EntryId::generate();
        let doc = serde_json::to_value(entry.clone().with_id(id))?;
        self.write(collection, |docs| {
            docs.push(doc);
            Ok(id)
        })
        .await
    }

    async fn update_value(&self, collection: &str, id: &EntryId, val: i64) -> Result<()> {
        self.write(collection, |docs| {
            let doc = docs
                .iter_mut()
                .find(|d| has_id(d, id))
                .ok_or_else(|| StoreError::NotFound(id.to_hex()))?;
            doc[VAL_FIELD] = Value::from(val);
            Ok(())
        })
        .await
    }

    async fn remove_by_key(&self, collection: &str, key: &str) -> Result<bool> {
        self.write(collection, |docs| {
            match docs.iter().position(|d| has_key(d, key)) {
                Some(pos) => {
                    docs.remove(pos);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<CounterEntry>> {
        let docs = self.read(collection, <[Value]>::to_vec).await?;
        Ok(docs.into_iter().filter_map(decode_doc).collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.read(collection, <[Value]>::len).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbcounter_core::CounterValue;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_insert_and_find() {
        let store = MemoryConnector::new();
        let session = store.connect("db").await.unwrap();
        let entry = CounterEntry::new("requests", CounterValue::Int(10_000));

        let id = session.insert("c", &entry).await.unwrap();
        assert_eq!(session.find_id_by_key("c", "requests").await.unwrap(), Some(id));

        let found = session.find_by_key("c", "requests").await.unwrap().unwrap();
        assert_eq!(found, entry.with_id(id));
        assert_eq!(session.count("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_update_keeps_kind() {
        let store = MemoryConnector::new();
        let session = store.connect("db").await.unwrap();
        let entry = CounterEntry::new("t", CounterValue::DurationNanos(5));
        let id = session.insert("c", &entry).await.unwrap();

        session.update_value("c", &id, 9).await.unwrap();

        let found = session.find_by_key("c", "t").await.unwrap().unwrap();
        assert_eq!(found.val, 9);
        assert_eq!(found.val_type, "duration");
    }

    #[tokio::test]
    async fn test_memory_update_missing_id() {
        let store = MemoryConnector::new();
        let session = store.connect("db").await.unwrap();
        let result = session.update_value("c", &EntryId::generate(), 1).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_memory_remove_absent_is_ok() {
        let store = MemoryConnector::new();
        let session = store.connect("db").await.unwrap();
        assert!(!session.remove_by_key("c", "missing").await.unwrap());

        session.insert("c", &CounterEntry::new("k", 1.into())).await.unwrap();
        assert!(session.remove_by_key("c", "k").await.unwrap());
        assert_eq!(session.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_databases_and_collections_are_isolated() {
        let store = MemoryConnector::new();
        let a = store.connect("a").await.unwrap();
        let b = store.connect("b").await.unwrap();

        a.insert("c", &CounterEntry::new("k", 1.into())).await.unwrap();
        assert_eq!(b.count("c").await.unwrap(), 0);
        assert_eq!(a.count("other").await.unwrap(), 0);
        assert_eq!(store.sessions_opened(), 2);
    }

    #[tokio::test]
    async fn test_memory_offline() {
        let store = MemoryConnector::new();
        let session = store.connect("db").await.unwrap();

        store.set_available(false);
        assert!(matches!(store.connect("db").await, Err(e) if e.is_connectivity()));
        assert!(session.count("c").await.unwrap_err().is_connectivity());

        store.set_available(true);
        assert_eq!(session.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_write_budget() {
        let store = MemoryConnector::new();
        let session = store.connect("db").await.unwrap();
        store.fail_writes_after(1);

        session.insert("c", &CounterEntry::new("a", 1.into())).await.unwrap();
        let err = session.insert("c", &CounterEntry::new("b", 1.into())).await.unwrap_err();
        assert!(err.is_connectivity());

        store.reset_faults();
        session.insert("c", &CounterEntry::new("b", 1.into())).await.unwrap();
        assert_eq!(session.count("c").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_memory_raw_document_without_tag() {
        let store = MemoryConnector::new();
        store.insert_document("db", "c", json!({"_id": "000000000000000000000001", "key": "k", "val": 4}));

        let session = store.connect("db").await.unwrap();
        let entries = session.find_all("c").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].val_type, "");
    }

    #[tokio::test]
    async fn test_memory_non_integer_values() {
        let store = MemoryConnector::new();
        store.insert_document("db", "c", json!({"_id": "000000000000000000000001", "key": "ok", "val": 3, "valType": "int"}));
        store.insert_document("db", "c", json!({"_id": "000000000000000000000002", "key": "ratio", "val": -1.5, "valType": "float64"}));
        store.insert_document("db", "c", json!({"_id": "000000000000000000000003", "key": "big", "val": u64::MAX, "valType": "uint64"}));
        store.insert_document("db", "c", json!({"_id": "000000000000000000000004", "key": "junk", "val": "three"}));

        let session = store.connect("db").await.unwrap();
        let entries = session.find_all("c").await.unwrap();
        let vals: Vec<(&str, i64)> = entries.iter().map(|e| (e.key.as_str(), e.val)).collect();
        assert_eq!(vals, vec![("ok", 3), ("ratio", -1), ("big", i64::MAX)]);

        assert_eq!(session.find_by_key("c", "ratio").await.unwrap().unwrap().val, -1);
        assert_eq!(session.find_by_key("c", "junk").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_operations_yield() {
        let store = MemoryConnector::new();
        let session = Arc::new(store.connect("db").await.unwrap());

        // A task spawned on the current thread gets to run while this one
        // waits on the store.
        let flag = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn({
            let flag = Arc::clone(&flag);
            async move { flag.store(true, Ordering::SeqCst) }
        });
        session.count("c").await.unwrap();
        assert!(flag.load(Ordering::SeqCst));
        task.await.unwrap();
    }
}
