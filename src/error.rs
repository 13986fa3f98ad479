//! Error types for the calculators and the draft store.

use thiserror::Error;

use crate::models::form::Field;

/// Errors raised by a single calculation.
///
/// Both kinds block the result: no partial report is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    /// A required field was left blank.
    #[error("missing input: {0}")]
    MissingInput(Field),

    /// A supplied value violates a formula precondition.
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: Field, reason: String },
}

impl CalcError {
    pub fn invalid(field: Field, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Field the error refers to.
    pub fn field(&self) -> Field {
        match self {
            CalcError::MissingInput(field) => *field,
            CalcError::InvalidInput { field, .. } => *field,
        }
    }
}

/// Errors raised while loading or saving a draft.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("draft is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("draft root must be a JSON object")]
    NotAnObject,

    #[error("draft value for `{key}` must be a finite number, string, boolean or null")]
    InvalidValue { key: String },
}
