//! Field names of a stored counter document.

/// Store-generated identifier.
pub const ID_FIELD: &str = "_id";

/// Counter key, unique within a collection.
pub const KEY_FIELD: &str = "key";

/// Raw numeric value.
pub const VAL_FIELD: &str = "val";

/// Kind tag of the raw value.
pub const VAL_TYPE_FIELD: &str = "valType";
