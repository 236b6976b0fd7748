//! The counter interface and its in-memory implementation.
//!
//! The persistence layer never owns counter data. It reads snapshots and
//! applies reloads exclusively through [`Counter`].

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::value::CounterValue;

/// A thread-safe map from string key to [`CounterValue`].
///
/// Every operation is individually atomic. No ordering is promised between
/// an enumeration and increments that race with it.
pub trait Counter: Send + Sync {
    /// Add `delta` to `key`, creating it with `delta` if absent.
    ///
    /// Returns the new value.
    fn increment(&self, key: &str, delta: CounterValue) -> CounterValue;

    /// Read the current value of `key`.
    fn value_at(&self, key: &str) -> Option<CounterValue>;

    /// Visit every (key, value) pair until the visitor returns `false`.
    fn for_each(&self, visitor: &mut dyn FnMut(&str, CounterValue) -> bool);

    /// Remove `key`, returning its last value.
    fn remove(&self, key: &str) -> Option<CounterValue>;

    /// Point-in-time copy of all pairs, in enumeration order.
    fn snapshot(&self) -> Vec<(String, CounterValue)> {
        let mut pairs = Vec::new();
        self.for_each(&mut |key, value| {
            pairs.push((key.to_string(), value));
            true
        });
        pairs
    }

    /// Number of keys currently held.
    fn len(&self) -> usize {
        let mut n = 0;
        self.for_each(&mut |_, _| {
            n += 1;
            true
        });
        n
    }

    /// Whether no keys are held.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory counter.
///
/// Keys enumerate in lexicographic order. Enumeration visits a copy taken
/// under the read lock, so visitors may call back into the counter.
#[derive(Default)]
pub struct MemoryCounter {
    values: RwLock<BTreeMap<String, CounterValue>>,
}

impl MemoryCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Counter for MemoryCounter {
    fn increment(&self, key: &str, delta: CounterValue) -> CounterValue {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        let slot = values
            .entry(key.to_string())
            .and_modify(|v| *v = v.saturating_add(delta))
            .or_insert(delta);
        *slot
    }

    fn value_at(&self, key: &str) -> Option<CounterValue> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).copied()
    }

    fn for_each(&self, visitor: &mut dyn FnMut(&str, CounterValue) -> bool) {
        let pairs: Vec<(String, CounterValue)> = {
            let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
            values.iter().map(|(k, v)| (k.clone(), *v)).collect()
        };

        for (key, value) in &pairs {
            if !visitor(key, *value) {
                break;
            }
        }
    }

    fn remove(&self, key: &str) -> Option<CounterValue> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key)
    }

    fn len(&self) -> usize {
        self.values.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
