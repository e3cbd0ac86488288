//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `IndexStore`
//! using the OpenSearch Rust crate.

use std::time::Duration;

use async_trait::async_trait;
use geo_indexer_shared::EntityKind;
use opensearch::{
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkOperation, BulkOperations, BulkParts, ClearScrollParts, GetParts, IndexParts, OpenSearch,
    ScrollParts, SearchParts, UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::StoreConfig;
use crate::errors::IndexStoreError;
use crate::interfaces::IndexStore;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::query::SearchRequest;
use crate::types::{
    BatchOperationSummary, BulkItem, IndexDocumentRequest, PartialUpdateRequest, SearchPage,
    StoredDocument,
};

/// OpenSearch-backed index store.
///
/// # Example
///
/// ```ignore
/// use geo_indexer_repository::opensearch::{IndexConfig, OpenSearchStore};
/// use geo_indexer_repository::StoreConfig;
///
/// let store = OpenSearchStore::new(
///     "http://localhost:9200",
///     IndexConfig::default(),
///     StoreConfig::default(),
/// )
/// .await?;
/// store.ensure_index_exists().await?;
/// ```
pub struct OpenSearchStore {
    client: OpenSearch,
    index_config: IndexConfig,
    config: StoreConfig,
}

impl OpenSearchStore {
    /// Create a new store connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - Prefix and version of the per-kind indices
    /// * `config` - Batch limit, timeout and conflict retry budget
    pub async fn new(
        url: &str,
        index_config: IndexConfig,
        config: StoreConfig,
    ) -> Result<Self, IndexStoreError> {
        let parsed_url = Url::parse(url).map_err(|e| IndexStoreError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| IndexStoreError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            prefix = %index_config.prefix,
            version = index_config.version,
            "Created OpenSearch store"
        );

        Ok(Self {
            client,
            index_config,
            config,
        })
    }

    pub fn index_config(&self) -> &IndexConfig {
        &self.index_config
    }

    fn keep_alive_param(keep_alive: Duration) -> String {
        format!("{}s", keep_alive.as_secs().max(1))
    }

    fn check_batch_size(&self, provided: usize) -> Result<(), IndexStoreError> {
        match self.config.max_batch_size {
            Some(max) if provided > max => Err(IndexStoreError::batch_size_exceeded(provided, max)),
            _ => Ok(()),
        }
    }

    /// Read the body of a failed response for logging.
    async fn failure_body(response: Response) -> String {
        response.text().await.unwrap_or_default()
    }

    async fn parse_json(response: Response) -> Result<Value, IndexStoreError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| IndexStoreError::parse(e.to_string()))
    }

    async fn create_index(&self, kind: EntityKind) -> Result<(), IndexStoreError> {
        let index_name = self.index_config.versioned_index_name(kind);
        let alias = self.index_config.alias(kind);

        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[alias.as_str()]))
            .send()
            .await
            .map_err(|e| IndexStoreError::connection(e.to_string()))?;

        if exists.status_code().is_success() {
            debug!(alias = %alias, "Index already exists");
            return Ok(());
        }

        let mut settings = get_index_settings(kind);
        settings["aliases"] = json!({ alias.as_str(): {} });

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index_name))
            .body(settings)
            .send()
            .await
            .map_err(|e| IndexStoreError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            // Another process may have created it between the check and the create
            if error_body.contains("resource_already_exists_exception") {
                debug!(index = %index_name, "Index created concurrently");
                return Ok(());
            }
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(IndexStoreError::index_creation(format!(
                "Creating {} failed with status {}: {}",
                index_name, status, error_body
            )));
        }

        info!(index = %index_name, alias = %alias, "Created index");
        Ok(())
    }
}

#[async_trait]
impl IndexStore for OpenSearchStore {
    async fn ensure_index_exists(&self) -> Result<(), IndexStoreError> {
        for kind in EntityKind::ALL {
            self.create_index(kind).await?;
        }
        Ok(())
    }

    async fn get_document(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<StoredDocument>, IndexStoreError> {
        let alias = self.index_config.alias(kind);
        let response = self
            .client
            .get(GetParts::IndexId(&alias, id))
            .send()
            .await
            .map_err(|e| IndexStoreError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            debug!(kind = %kind, id = %id, "Document not found");
            return Ok(None);
        }
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Get request failed");
            return Err(IndexStoreError::query(format!(
                "Get failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::parse_json(response).await?;
        if body.get("found").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }

        Ok(Some(StoredDocument {
            id: id.to_string(),
            source: body
                .get("_source")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }))
    }

    async fn index_document(
        &self,
        request: &IndexDocumentRequest,
    ) -> Result<String, IndexStoreError> {
        let alias = self.index_config.alias(request.kind);
        let timeout = self.config.timeout_param();
        let parts = match request.id.as_deref() {
            Some(id) if id.is_empty() => {
                return Err(IndexStoreError::validation("document id cannot be empty"))
            }
            Some(id) => IndexParts::IndexId(&alias, id),
            None => IndexParts::Index(&alias),
        };

        let response = self
            .client
            .index(parts)
            .timeout(&timeout)
            .body(Value::Object(request.body.clone()))
            .send()
            .await
            .map_err(|e| IndexStoreError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Index request failed");
            return Err(IndexStoreError::index(format!(
                "Index failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::parse_json(response).await?;
        let id = body
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| IndexStoreError::parse("index response without _id"))?;

        debug!(kind = %request.kind, id = %id, "Document indexed");
        Ok(id)
    }

    async fn update_document(&self, request: &PartialUpdateRequest) -> Result<(), IndexStoreError> {
        if request.id.is_empty() {
            return Err(IndexStoreError::validation("document id cannot be empty"));
        }
        if request.doc.is_empty() {
            // Nothing to merge
            return Ok(());
        }

        let alias = self.index_config.alias(request.kind);
        let timeout = self.config.timeout_param();

        // API reference: https://docs.opensearch.org/latest/api-reference/document-apis/update-document/
        let response = self
            .client
            .update(UpdateParts::IndexId(&alias, &request.id))
            .retry_on_conflict(i64::from(request.retry_on_conflict))
            .timeout(&timeout)
            .body(json!({ "doc": request.doc }))
            .send()
            .await
            .map_err(|e| IndexStoreError::update(e.to_string()))?;

        let status = response.status_code();
        match status.as_u16() {
            409 => {
                warn!(
                    kind = %request.kind,
                    id = %request.id,
                    retries = request.retry_on_conflict,
                    "Update kept conflicting"
                );
                Err(IndexStoreError::version_conflict(
                    &request.id,
                    request.retry_on_conflict,
                ))
            }
            404 => Err(IndexStoreError::document_not_found(
                request.kind.as_str(),
                &request.id,
            )),
            _ if !status.is_success() => {
                let error_body = Self::failure_body(response).await;
                error!(status = %status, body = %error_body, "Update request failed");
                Err(IndexStoreError::update(format!(
                    "Update failed with status {}: {}",
                    status, error_body
                )))
            }
            _ => {
                debug!(kind = %request.kind, id = %request.id, "Document updated");
                Ok(())
            }
        }
    }

    async fn bulk(
        &self,
        kind: EntityKind,
        items: &[BulkItem],
    ) -> Result<BatchOperationSummary, IndexStoreError> {
        if items.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }
        self.check_batch_size(items.len())?;

        let mut operations = BulkOperations::new();
        for item in items {
            let pushed = match item {
                BulkItem::Index { id, body } => {
                    let operation = BulkOperation::index(Value::Object(body.clone()));
                    match id {
                        Some(id) => operations.push(operation.id(id.as_str())),
                        None => operations.push(operation),
                    }
                }
                BulkItem::Update { id, doc } => operations.push(
                    BulkOperation::update(id.as_str(), json!({ "doc": doc }))
                        .retry_on_conflict(self.config.retry_on_conflict as i32),
                ),
            };
            pushed.map_err(|e| IndexStoreError::serialization(e.to_string()))?;
        }

        let alias = self.index_config.alias(kind);
        let response = self
            .client
            .bulk(BulkParts::Index(&alias))
            .body(vec![operations])
            .send()
            .await
            .map_err(|e| IndexStoreError::bulk(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(IndexStoreError::bulk(format!(
                "Bulk failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::parse_json(response).await?;
        let summary = BatchOperationSummary::from_bulk_response(&body)?;

        if summary.failed > 0 {
            warn!(
                kind = %kind,
                total = summary.total,
                failed = summary.failed,
                "Bulk request partially failed"
            );
        } else {
            debug!(kind = %kind, total = summary.total, "Bulk request completed");
        }

        Ok(summary)
    }

    async fn search(
        &self,
        kind: EntityKind,
        request: &SearchRequest,
    ) -> Result<SearchPage, IndexStoreError> {
        let alias = self.index_config.alias(kind);
        let response = self
            .client
            .search(SearchParts::Index(&[alias.as_str()]))
            .body(request.to_body())
            .send()
            .await
            .map_err(|e| IndexStoreError::query(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Search request failed");
            return Err(IndexStoreError::query(format!(
                "Search failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::parse_json(response).await?;
        SearchPage::from_response(&body)
    }

    async fn open_scroll(
        &self,
        kind: EntityKind,
        request: &SearchRequest,
        keep_alive: Duration,
    ) -> Result<SearchPage, IndexStoreError> {
        let alias = self.index_config.alias(kind);
        let keep_alive = Self::keep_alive_param(keep_alive);
        let response = self
            .client
            .search(SearchParts::Index(&[alias.as_str()]))
            .scroll(&keep_alive)
            .body(request.to_body())
            .send()
            .await
            .map_err(|e| IndexStoreError::query(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Scroll search failed");
            return Err(IndexStoreError::query(format!(
                "Scroll search failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::parse_json(response).await?;
        let page = SearchPage::from_response(&body)?;
        debug!(kind = %kind, total = page.total, "Opened scroll");
        Ok(page)
    }

    async fn scroll(
        &self,
        scroll_id: &str,
        keep_alive: Duration,
    ) -> Result<SearchPage, IndexStoreError> {
        let keep_alive = Self::keep_alive_param(keep_alive);
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({
                "scroll": keep_alive,
                "scroll_id": scroll_id
            }))
            .send()
            .await
            .map_err(|e| IndexStoreError::query(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Scroll request failed");
            return Err(IndexStoreError::query(format!(
                "Scroll failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::parse_json(response).await?;
        SearchPage::from_response(&body)
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), IndexStoreError> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [scroll_id] }))
            .send()
            .await
            .map_err(|e| IndexStoreError::query(e.to_string()))?;

        let status = response.status_code();
        // 404 means the context already expired
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = Self::failure_body(response).await;
            return Err(IndexStoreError::query(format!(
                "Clear scroll failed with status {}: {}",
                status, error_body
            )));
        }

        debug!("Scroll context cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_invalid_url() {
        let result =
            OpenSearchStore::new("not a url", IndexConfig::default(), StoreConfig::default()).await;
        assert!(matches!(result, Err(IndexStoreError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_batch_size_limit() {
        let store = OpenSearchStore::new(
            "http://localhost:9200",
            IndexConfig::default(),
            StoreConfig::with_max_batch_size(2),
        )
        .await
        .unwrap();

        assert!(store.check_batch_size(2).is_ok());
        assert!(matches!(
            store.check_batch_size(3),
            Err(IndexStoreError::BatchSizeExceeded { provided: 3, max: 2 })
        ));
    }

    #[tokio::test]
    async fn test_empty_bulk_makes_no_request() {
        // Nothing listens on this port; an empty batch must not touch the network
        let store = OpenSearchStore::new(
            "http://127.0.0.1:1",
            IndexConfig::default(),
            StoreConfig::default(),
        )
        .await
        .unwrap();

        let summary = store.bulk(EntityKind::Locality, &[]).await.unwrap();
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn test_keep_alive_param() {
        assert_eq!(
            OpenSearchStore::keep_alive_param(Duration::from_secs(600)),
            "600s"
        );
        assert_eq!(
            OpenSearchStore::keep_alive_param(Duration::from_millis(10)),
            "1s"
        );
    }
}
