//! Error types for the geo indexer.

use geo_indexer_repository::IndexStoreError;
use geo_indexer_shared::ModelError;
use thiserror::Error;

/// Errors that can occur while building, enriching or reindexing entities.
#[derive(Error, Debug)]
pub enum GeoIndexError {
    /// An entity could not be built from its parameters.
    #[error("Model error: {0}")]
    ModelError(#[from] ModelError),

    /// The index store rejected or failed a request.
    #[error("Store error: {0}")]
    StoreError(#[from] IndexStoreError),

    /// A reference table could not be loaded.
    #[error("Reference data error: {0}")]
    ReferenceDataError(String),

    /// The task queue refused a task.
    #[error("Task queue error: {0}")]
    TaskQueueError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An operation was called on an entity that is not in the right state.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl GeoIndexError {
    /// Create a reference data error.
    pub fn reference_data(msg: impl Into<String>) -> Self {
        Self::ReferenceDataError(msg.into())
    }

    /// Create a task queue error.
    pub fn task_queue(msg: impl Into<String>) -> Self {
        Self::TaskQueueError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Whether retrying the same unit of work may succeed.
    ///
    /// Store outages, exhausted version conflicts and failed bulk requests are
    /// recoverable. Bad input and configuration are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::StoreError(e) => e.is_unavailable() || e.is_conflict(),
            Self::ReferenceDataError(_) => true,
            Self::ModelError(_)
            | Self::TaskQueueError(_)
            | Self::ConfigError(_)
            | Self::ValidationError(_) => false,
        }
    }
}
