//! Error types for the entity model.

use thiserror::Error;

/// Errors raised while building or updating an entity from a parameter mapping.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// A recognized field was given a value of the wrong shape.
    #[error("Invalid value for field '{field}': expected {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    /// An entity kind name that is not part of the closed kind set.
    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),
}

impl ModelError {
    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidField {
            field: field.into(),
            expected,
        }
    }
}
