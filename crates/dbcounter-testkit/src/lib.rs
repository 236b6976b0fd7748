//! # dbcounter Testkit
//!
//! Testing utilities for dbcounter.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Generators**: Proptest strategies for counter keys, values, and states
//! - **Fixtures**: Scratch storage and ready-made coordinators
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use dbcounter_testkit::generators::CounterStateParams;
//!
//! proptest! {
//!     #[test]
//!     fn reload_restores_state(params: CounterStateParams) {
//!         // persist params.state, reload params.reloads times, compare
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use dbcounter_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let coordinator = fixture.sqlite_coordinator();
//! assert!(!coordinator.is_running());
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    counter_with, seed_counter, MemoryCoordinator, SqliteCoordinator, TestFixture,
    TEST_COLLECTION, TEST_DATABASE,
};
pub use generators::{counter_key, counter_state, counter_value, value_kind, CounterStateParams};
