//! Engine error taxonomy.

use core::fmt;

use thiserror::Error;

use meridian_store::StoreError;

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The input field at fault.
    pub field: &'static str,
    /// Human-readable description of the problem.
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by engine operations.
///
/// `Validation`, `NotFound`, and `Conflict` are user-correctable and carry
/// structured detail. `Internal` wraps a store failure: the transaction
/// has been rolled back and no partial write is observable, but the detail
/// is not the caller's to act on.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad input shape or range, reported per field.
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<FieldError>),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (e.g., duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store or infrastructure failure. Not retried by the engine.
    #[error("internal error: {0}")]
    Internal(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::InvalidCursor(_) => Self::Validation(vec![FieldError::new(
                "cursor",
                "malformed pagination cursor",
            )]),
            other => Self::Internal(other),
        }
    }
}
