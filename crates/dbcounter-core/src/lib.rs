//! # dbcounter Core
//!
//! Pure primitives for dbcounter: tagged counter values, stored entries, and
//! the counter interface the persistence layer reads and writes through.
//!
//! This crate contains no I/O, no storage, no async. It is plain data plus a
//! thread-safe in-memory counter.
//!
//! ## Key Types
//!
//! - [`CounterValue`] - A numeric value that remembers its representation
//! - [`ValueKind`] - The tag persisted next to each value
//! - [`CounterEntry`] - The stored record for one counter key
//! - [`EntryId`] - Store-generated record identifier
//! - [`Counter`] - The counter interface (increment, read, enumerate, remove)
//! - [`MemoryCounter`] - Thread-safe in-memory [`Counter`]
//!
//! ## Value Kinds
//!
//! Storage only keeps a raw integer, so each value travels with a tag:
//!
//! ```rust
//! use std::time::Duration;
//! use dbcounter_core::{CounterEntry, CounterValue, ValueKind};
//!
//! let entry = CounterEntry::new("latency", CounterValue::from(Duration::from_micros(10)));
//! assert_eq!(entry.val, 10_000);
//! assert_eq!(entry.kind(), Some(ValueKind::Duration));
//! assert_eq!(entry.decode().unwrap(), CounterValue::DurationNanos(10_000));
//! ```

pub mod counter;
pub mod entry;
pub mod error;
pub mod types;
pub mod value;

pub use counter::{Counter, MemoryCounter};
pub use entry::CounterEntry;
pub use error::{CoreError, Result};
pub use types::EntryId;
pub use value::{CounterValue, ValueKind};
