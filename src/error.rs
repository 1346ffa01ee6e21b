//! Error taxonomy for the query pipeline.
//!
//! - [`QueryError`] is what handlers see: client faults (bad collection or
//!   range) and transport faults (store failures).
//! - [`ParseAnomaly`] never escapes the normalizer; it is counted and then
//!   replaced by a sentinel value.
//! - [`ImportError`] covers the manual JSON file import.

use thiserror::Error;

/// Failures while talking to the backing document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store query failed: {0}")]
    Query(String),

    #[error("malformed document in collection '{collection}': {reason}")]
    Decode { collection: String, reason: String },
}

/// Errors surfaced by the query endpoint.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid collection: {0}")]
    InvalidSource(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    /// True when the caller sent bad input (HTTP 400), false for server faults.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::InvalidSource(_) | Self::InvalidRange(_))
    }
}

/// A single field that could not be read as expected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAnomaly {
    #[error("no time value present")]
    EmptyTime,

    #[error("unparseable time '{0}'")]
    UnparseableTime(String),

    #[error("field '{field}' is not a number")]
    UnparseableNumber { field: &'static str },

    #[error("field '{field}' is missing")]
    MissingNumber { field: &'static str },
}

impl ParseAnomaly {
    pub fn is_time(&self) -> bool {
        matches!(self, Self::EmptyTime | Self::UnparseableTime(_))
    }
}

/// Manual JSON import failures, shown to the user as-is.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse JSON: JSON must be an array")]
    NotAnArray,
}
