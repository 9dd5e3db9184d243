//! Error types for the radar engine

use thiserror::Error;

/// Errors returned by radar construction and radar operations.
///
/// Geometry helpers never fail on numeric edge cases (poles, antimeridian);
/// they only reject values that are not numbers at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RadarError {
    /// A required field is missing or a value is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation conflicts with the current state (e.g. a second active sweep)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A marker with this id is already tracked
    #[error("Duplicate marker id: {0}")]
    DuplicateId(String),

    /// The addressed sweep or shape does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl RadarError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        RadarError::InvalidArgument(msg.into())
    }
}
