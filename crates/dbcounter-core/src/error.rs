//! Error types for dbcounter core.

use thiserror::Error;

/// Errors raised while interpreting counter values and stored entries.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored `valType` tag that no [`crate::ValueKind`] recognizes.
    #[error("unknown value kind: {0:?}")]
    UnknownValueKind(String),

    /// An entry identifier that is not 24 hex characters.
    #[error("invalid entry id: {0}")]
    InvalidEntryId(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
