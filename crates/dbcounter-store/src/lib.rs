//! # dbcounter Store
//!
//! Document store abstraction for dbcounter. Provides a trait-based interface
//! for counter-record persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! Storage is reached through a [`Connector`], which opens a fresh
//! [`Session`] per operation. Sessions are released when dropped, so a
//! transient failure in one operation never poisons the next.
//!
//! ## Key Types
//!
//! - [`Connector`] - Opens sessions against a named database
//! - [`Session`] - Record operations on named collections
//! - [`SqliteConnector`] - SQLite-backed durable storage
//! - [`MemoryConnector`] - In-process JSON document storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dbcounter_core::{CounterEntry, CounterValue};
//! use dbcounter_store::{Connector, Session, SqliteConnector};
//!
//! async fn example() {
//!     // Each database lives in `<endpoint>/<database>.sqlite3`
//!     let connector = SqliteConnector::new("/var/lib/counters");
//!     let session = connector.connect("metrics").await.unwrap();
//!
//!     let entry = CounterEntry::new("requests", CounterValue::Int(1));
//!     let id = session.insert("counters", &entry).await.unwrap();
//!     session.update_value("counters", &id, 2).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Unique keys**: a collection holds at most one record per key; callers
//!   find by key before inserting.
//! - **Absent keys**: removing or looking up a missing key is not an error.
//! - **Raw tags**: stored `valType` tags are returned verbatim; interpreting
//!   them is up to the caller.

pub mod error;
pub mod memory;
pub mod migration;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryConnector, MemorySession};
pub use sqlite::{SqliteConnector, SqliteSession};
pub use traits::{Connector, Session};
