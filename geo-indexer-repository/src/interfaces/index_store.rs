//! Index store trait definition.
//!
//! This module defines the abstract interface for document store operations,
//! allowing for different backend implementations (OpenSearch, in-memory mocks).

use std::time::Duration;

use async_trait::async_trait;
use geo_indexer_shared::EntityKind;

use crate::errors::IndexStoreError;
use crate::query::SearchRequest;
use crate::types::{
    BatchOperationSummary, BulkItem, IndexDocumentRequest, PartialUpdateRequest, SearchPage,
    StoredDocument,
};

/// Abstracts the underlying document store.
///
/// Every entity kind lives in its own index; all operations are addressed by
/// kind. Implementations are injected into the resolvers, loader and reindex
/// pipeline, which makes them easy to replace with in-memory mocks in tests.
///
/// # Index Initialization
///
/// Implementations should call `ensure_index_exists` during application startup to ensure
/// every kind's index and alias are configured before performing document operations.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Ensure the index and alias of every entity kind exist, creating them if necessary.
    async fn ensure_index_exists(&self) -> Result<(), IndexStoreError>;

    /// Fetch a document by id.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(StoredDocument))` - If the document exists
    /// * `Ok(None)` - If there is no document with that id
    /// * `Err(IndexStoreError)` - If the lookup fails
    async fn get_document(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<StoredDocument>, IndexStoreError>;

    /// Write a full document, replacing any document with the same id.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The document id, assigned by the store when the request has none
    /// * `Err(IndexStoreError)` - If the write fails
    async fn index_document(&self, request: &IndexDocumentRequest)
        -> Result<String, IndexStoreError>;

    /// Merge fields into an existing document.
    ///
    /// Version conflicts are retried up to `request.retry_on_conflict` times;
    /// exhausting the budget yields `IndexStoreError::VersionConflict`.
    async fn update_document(&self, request: &PartialUpdateRequest) -> Result<(), IndexStoreError>;

    /// Execute a batch of index and update items against one kind's index.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Aggregate statistics and per-item results
    /// * `Err(IndexStoreError)` - If the bulk request fails entirely
    async fn bulk(
        &self,
        kind: EntityKind,
        items: &[BulkItem],
    ) -> Result<BatchOperationSummary, IndexStoreError>;

    /// Run a single search against one kind's index.
    async fn search(
        &self,
        kind: EntityKind,
        request: &SearchRequest,
    ) -> Result<SearchPage, IndexStoreError>;

    /// Run a search and keep a scroll context open for `keep_alive`.
    ///
    /// The returned page carries the cursor for [`IndexStore::scroll`].
    async fn open_scroll(
        &self,
        kind: EntityKind,
        request: &SearchRequest,
        keep_alive: Duration,
    ) -> Result<SearchPage, IndexStoreError>;

    /// Fetch the next page of an open scroll context.
    async fn scroll(
        &self,
        scroll_id: &str,
        keep_alive: Duration,
    ) -> Result<SearchPage, IndexStoreError>;

    /// Release a scroll context before it expires.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), IndexStoreError>;
}
