//! # dbcounter
//!
//! Durability for in-memory counters: periodic snapshots into a document
//! store, point deletion, and additive reload.
//!
//! ## Overview
//!
//! A [`PersistenceCoordinator`] sits between a [`Counter`] and a storage
//! [`Connector`](store::Connector):
//!
//! - **Persist**: upsert one record per counter key, tagged with its value kind
//! - **Background**: persist on a fixed interval until stopped
//! - **Clear**: remove a key from storage, then from memory
//! - **Reload**: add every stored value back into the counter
//!
//! ## Key Concepts
//!
//! - **Record**: `{_id, key, val, valType}`, unique per key within a collection.
//! - **Value kind**: `int` or `duration`. Duration values are stored as
//!   nanoseconds and come back as durations.
//! - **Reload is additive**: it increments, it does not overwrite.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use dbcounter::{Counter, CoordinatorConfig, MemoryCounter, PersistenceCoordinator};
//!
//! async fn example() {
//!     let counter = Arc::new(MemoryCounter::new());
//!     let config = CoordinatorConfig::default().with_endpoint("/var/lib/counters");
//!     let coordinator = PersistenceCoordinator::sqlite(Arc::clone(&counter), config).unwrap();
//!
//!     // Pick up whatever a previous run stored
//!     coordinator.update_from_db().await.unwrap();
//!
//!     coordinator.start_background(Duration::from_secs(10));
//!     counter.increment("requests", 1.into());
//!
//!     // Stops the timer and flushes once more
//!     coordinator.stop().await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `dbcounter::core` - Counter interface and value types
//! - `dbcounter::store` - Storage abstraction, SQLite and in-memory backends

pub mod config;
pub mod coordinator;
pub mod error;

// Re-export component crates
pub use dbcounter_core as core;
pub use dbcounter_store as store;

// Re-export main types for convenience
pub use config::{CoordinatorConfig, DEFAULT_INTERVAL};
pub use coordinator::{PersistReport, PersistenceCoordinator};
pub use error::{CoordinatorError, Result};

// Re-export commonly used core types
pub use dbcounter_core::{Counter, CounterEntry, CounterValue, MemoryCounter, ValueKind};
