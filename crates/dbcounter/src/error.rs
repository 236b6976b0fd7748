//! Error types for the persistence coordinator.

use dbcounter_store::StoreError;
use thiserror::Error;

/// Errors that can occur during coordinator operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoordinatorError {
    /// Whether the store was unreachable. Callers may retry these.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, CoordinatorError::Store(e) if e.is_connectivity())
    }
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;
