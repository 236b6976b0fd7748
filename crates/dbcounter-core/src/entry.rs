//! The persisted record for one counter key.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::EntryId;
use crate::value::{CounterValue, ValueKind};

/// A stored counter record.
///
/// Serializes to the document shape `{_id, key, val, valType}`. The `id` is
/// absent until the store assigns one on insert. `val_type` is kept as the raw
/// stored tag so records written with an unknown or missing tag still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterEntry {
    /// Store-generated identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    /// Counter key, unique within a collection.
    pub key: String,
    /// Raw stored value.
    pub val: i64,
    /// Raw stored kind tag.
    #[serde(rename = "valType", default)]
    pub val_type: String,
}

impl CounterEntry {
    /// Build a new (not yet stored) entry from a tagged value.
    pub fn new(key: impl Into<String>, value: CounterValue) -> Self {
        Self {
            id: None,
            key: key.into(),
            val: value.raw(),
            val_type: value.kind().as_tag().to_string(),
        }
    }

    /// Attach a store-generated identifier.
    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }

    /// The recognized kind, if the stored tag is known.
    pub fn kind(&self) -> Option<ValueKind> {
        ValueKind::from_tag(&self.val_type)
    }

    /// Reconstruct the tagged value, failing on an unknown tag.
    pub fn decode(&self) -> Result<CounterValue> {
        self.kind()
            .map(|kind| CounterValue::from_raw(kind, self.val))
            .ok_or_else(|| CoreError::UnknownValueKind(self.val_type.clone()))
    }

    /// Reconstruct the tagged value, treating an unknown tag as a plain integer.
    pub fn decode_or_raw(&self) -> CounterValue {
        self.decode().unwrap_or(CounterValue::Int(self.val))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_entry_tags_kind() {
        let entry = CounterEntry::new("requests", CounterValue::Int(10_000));
        assert_eq!(entry.id, None);
        assert_eq!(entry.val, 10_000);
        assert_eq!(entry.val_type, "int");

        let entry = CounterEntry::new("latency", CounterValue::DurationNanos(7));
        assert_eq!(entry.val_type, "duration");
        assert_eq!(entry.decode().unwrap(), CounterValue::DurationNanos(7));
    }

    #[test]
    fn test_document_shape() {
        let id = EntryId::from_bytes([1; 12]);
        let entry = CounterEntry::new("requests", CounterValue::Int(10_000)).with_id(id);
        let doc = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            doc,
            json!({
                "_id": "010101010101010101010101",
                "key": "requests",
                "val": 10000,
                "valType": "int",
            })
        );
    }

    #[test]
    fn test_pre_insert_document_has_no_id() {
        let entry = CounterEntry::new("k", CounterValue::Int(1));
        let doc = serde_json::to_value(&entry).unwrap();
        assert!(doc.get("_id").is_none());
    }

    #[test]
    fn test_unknown_tag_falls_back_to_raw() {
        let doc = json!({"key": "k", "val": 12, "valType": "float64"});
        let entry: CounterEntry = serde_json::from_value(doc).unwrap();
        assert!(matches!(entry.decode(), Err(CoreError::UnknownValueKind(t)) if t == "float64"));
        assert_eq!(entry.decode_or_raw(), CounterValue::Int(12));
    }

    #[test]
    fn test_legacy_duration_record() {
        let doc = json!({"key": "lat", "val": 10000, "valType": "time.Duration"});
        let entry: CounterEntry = serde_json::from_value(doc).unwrap();
        assert_eq!(entry.decode().unwrap(), CounterValue::DurationNanos(10_000));
    }

    #[test]
    fn test_missing_tag_falls_back_to_raw() {
        let doc = json!({"key": "k", "val": 3});
        let entry: CounterEntry = serde_json::from_value(doc).unwrap();
        assert_eq!(entry.val_type, "");
        assert_eq!(entry.kind(), None);
        assert_eq!(entry.decode_or_raw(), CounterValue::Int(3));
    }
}
