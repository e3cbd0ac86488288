//! # Geo Indexer Repository
//!
//! This crate provides the index store abstraction used by the geo indexer:
//! the [`IndexStore`] trait, a small typed query DSL, request and response
//! types, and a concrete implementation for OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod query;
pub mod types;

pub use config::StoreConfig;
pub use errors::IndexStoreError;
pub use interfaces::IndexStore;
pub use opensearch::{IndexConfig, OpenSearchStore};
pub use query::{Query, Relation, SearchRequest, ShapeRef, SortClause, SortOrder};
pub use types::{
    BatchOperationResult, BatchOperationSummary, BulkItem, IndexDocumentRequest,
    PartialUpdateRequest, SearchHit, SearchPage, StoredDocument,
};
