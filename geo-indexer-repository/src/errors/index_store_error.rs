//! Index store error types.
//!
//! This module defines the unified error type for all index store operations,
//! covering transport failures, rejected requests and response parsing.

use thiserror::Error;

/// Unified errors from index store operations.
///
/// Lookups by id never produce an error for a missing document; they return
/// `None` instead. `DocumentNotFound` is reserved for operations that require
/// the document to exist, such as partial updates.
#[derive(Debug, Clone, Error)]
pub enum IndexStoreError {
    /// Validation error (e.g., missing document id, empty bulk item).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The store could not be reached or the transport failed.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A search or scroll request failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to index a document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Failed to update a document.
    #[error("Update error: {0}")]
    UpdateError(String),

    /// A partial update kept conflicting after the configured retries.
    #[error("Version conflict on document {id} after {retries} retries")]
    VersionConflict { id: String, retries: u32 },

    /// Bulk operation failed as a whole.
    #[error("Bulk error: {0}")]
    BulkError(String),

    /// Failed to create an index or alias.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse a response from the store.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a request body.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Document required by the operation does not exist.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },
}

impl IndexStoreError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create an update error.
    pub fn update(msg: impl Into<String>) -> Self {
        Self::UpdateError(msg.into())
    }

    /// Create a version conflict error.
    pub fn version_conflict(id: impl Into<String>, retries: u32) -> Self {
        Self::VersionConflict {
            id: id.into(),
            retries,
        }
    }

    /// Create a bulk error.
    pub fn bulk(msg: impl Into<String>) -> Self {
        Self::BulkError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a document not found error.
    pub fn document_not_found(kind: &str, id: &str) -> Self {
        Self::DocumentNotFound(format!("kind={}, id={}", kind, id))
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Returns true when the store itself was unavailable or failed to
    /// execute the request, as opposed to rejecting the request's content.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError(_)
                | Self::QueryError(_)
                | Self::IndexError(_)
                | Self::UpdateError(_)
                | Self::BulkError(_)
        )
    }

    /// Returns true when a partial update exhausted its conflict retries.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
