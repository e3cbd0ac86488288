//! Request and response types for index store operations.

use geo_indexer_shared::EntityKind;
use serde_json::{Map, Value};

use crate::errors::IndexStoreError;

/// A document fetched by id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub source: Map<String, Value>,
}

/// One hit of a search or scroll page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Store document id (`_id`).
    pub id: String,
    /// Stored document body (`_source`).
    pub source: Map<String, Value>,
    /// Relevance score, absent for sorted or filtered-only queries.
    pub score: Option<f64>,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, source: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            source,
            score: None,
        }
    }

    fn from_value(hit: &Value) -> Result<Self, IndexStoreError> {
        let id = hit
            .get("_id")
            .and_then(Value::as_str)
            .ok_or_else(|| IndexStoreError::parse("hit without _id"))?;
        let source = hit
            .get("_source")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Ok(Self {
            id: id.to_string(),
            source,
            score: hit.get("_score").and_then(Value::as_f64),
        })
    }
}

/// One page of search results, possibly tied to an open scroll context.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    /// Total number of matching documents.
    pub total: u64,
    /// Opaque cursor for the next page, when the page came from a scroll.
    pub scroll_id: Option<String>,
}

impl SearchPage {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Parse a search or scroll response body.
    ///
    /// Accepts both the object (`{"value": n}`) and the legacy numeric form
    /// of `hits.total`.
    pub fn from_response(body: &Value) -> Result<Self, IndexStoreError> {
        let hits_section = body
            .get("hits")
            .ok_or_else(|| IndexStoreError::parse("response without hits"))?;

        let total = match hits_section.get("total") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
            _ => 0,
        };

        let hits = hits_section
            .get("hits")
            .and_then(Value::as_array)
            .map(|hits| {
                hits.iter()
                    .map(SearchHit::from_value)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            hits,
            total,
            scroll_id: body
                .get("_scroll_id")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// Request to write a full document.
///
/// When `id` is `None` the store assigns one.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocumentRequest {
    pub kind: EntityKind,
    pub id: Option<String>,
    pub body: Map<String, Value>,
}

/// Request to merge fields into an existing document.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialUpdateRequest {
    pub kind: EntityKind,
    pub id: String,
    /// Fields to merge. Fields not present are left untouched.
    pub doc: Map<String, Value>,
    /// Optimistic-concurrency retry budget.
    pub retry_on_conflict: u32,
}

/// One item of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkItem {
    /// Write a full document, store-assigned id when `id` is `None`.
    Index {
        id: Option<String>,
        body: Map<String, Value>,
    },
    /// Merge fields into an existing document.
    Update {
        id: String,
        doc: Map<String, Value>,
    },
}

impl BulkItem {
    pub fn id(&self) -> Option<&str> {
        match self {
            BulkItem::Index { id, .. } => id.as_deref(),
            BulkItem::Update { id, .. } => Some(id),
        }
    }
}

/// Result of a batch operation for a single item.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// Document id, as given in the request or assigned by the store.
    pub id: Option<String>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// HTTP status of the item, 0 when the response carried none.
    pub status: u16,
    /// Error if the operation failed.
    pub error: Option<IndexStoreError>,
}

impl BatchOperationResult {
    /// A successful item.
    pub fn ok(id: Option<String>, status: u16) -> Self {
        Self {
            id,
            success: true,
            status,
            error: None,
        }
    }

    /// Whether sending the same item again may succeed: version conflicts,
    /// throttling and server errors.
    pub fn is_retryable(&self) -> bool {
        !self.success && matches!(self.status, 409 | 429 | 500..=599)
    }
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// This allows callers to handle partial failures of a bulk request.
#[derive(Debug, Clone)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    pub fn empty() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Parse the `items` array of a bulk response.
    pub fn from_bulk_response(body: &Value) -> Result<Self, IndexStoreError> {
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| IndexStoreError::parse("bulk response without items"))?;

        let results = items
            .iter()
            .map(|item| {
                // Each item is keyed by its action: {"index": {...}} or {"update": {...}}
                let outcome = item
                    .as_object()
                    .and_then(|actions| actions.values().next())
                    .cloned()
                    .unwrap_or(Value::Null);
                let id = outcome.get("_id").and_then(Value::as_str).map(str::to_string);
                let status = outcome
                    .get("status")
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or(0);

                match outcome.get("error") {
                    Some(error) if !error.is_null() => BatchOperationResult {
                        id,
                        success: false,
                        status,
                        error: Some(IndexStoreError::bulk(format!(
                            "status {}: {}",
                            status, error
                        ))),
                    },
                    _ => BatchOperationResult {
                        id,
                        success: (200..300).contains(&status),
                        status,
                        error: None,
                    },
                }
            })
            .collect();

        Ok(Self::from_results(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_page_from_response() {
        let body = json!({
            "_scroll_id": "cursor-1",
            "hits": {
                "total": {"value": 120, "relation": "eq"},
                "hits": [
                    {"_id": "a", "_score": null, "_source": {"name": "Alpha"}},
                    {"_id": "b", "_source": {"name": "Beta"}}
                ]
            }
        });

        let page = SearchPage::from_response(&body).unwrap();
        assert_eq!(page.total, 120);
        assert_eq!(page.len(), 2);
        assert_eq!(page.scroll_id.as_deref(), Some("cursor-1"));
        assert_eq!(page.hits[0].id, "a");
        assert_eq!(page.hits[1].source["name"], "Beta");
        assert!(page.hits[0].score.is_none());
    }

    #[test]
    fn test_search_page_legacy_total() {
        let body = json!({"hits": {"total": 0, "hits": []}});
        let page = SearchPage::from_response(&body).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total, 0);
        assert!(page.scroll_id.is_none());
    }

    #[test]
    fn test_search_page_rejects_hit_without_id() {
        let body = json!({"hits": {"hits": [{"_source": {}}]}});
        assert!(matches!(
            SearchPage::from_response(&body),
            Err(IndexStoreError::ParseError(_))
        ));
    }

    #[test]
    fn test_bulk_response_with_partial_failure() {
        let body = json!({
            "errors": true,
            "items": [
                {"update": {"_id": "a", "status": 200}},
                {"update": {"_id": "b", "status": 404, "error": {"type": "document_missing_exception"}}},
                {"index": {"_id": "generated", "status": 201}}
            ]
        });

        let summary = BatchOperationSummary::from_bulk_response(&body).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results[1].id.as_deref(), Some("b"));
        assert!(summary.results[1].error.is_some());
        assert_eq!(summary.results[1].status, 404);
        assert_eq!(summary.results[2].id.as_deref(), Some("generated"));
    }

    #[test]
    fn test_retryable_item_statuses() {
        let body = json!({
            "errors": true,
            "items": [
                {"update": {"_id": "ok", "status": 200}},
                {"update": {"_id": "missing", "status": 404, "error": {"type": "document_missing_exception"}}},
                {"update": {"_id": "mapping", "status": 400, "error": {"type": "mapper_parsing_exception"}}},
                {"update": {"_id": "conflict", "status": 409, "error": {"type": "version_conflict_engine_exception"}}},
                {"update": {"_id": "throttled", "status": 429, "error": {"type": "es_rejected_execution_exception"}}},
                {"update": {"_id": "down", "status": 503, "error": {"type": "unavailable_shards_exception"}}}
            ]
        });

        let summary = BatchOperationSummary::from_bulk_response(&body).unwrap();
        let retryable: Vec<&str> = summary
            .results
            .iter()
            .filter(|r| r.is_retryable())
            .filter_map(|r| r.id.as_deref())
            .collect();
        assert_eq!(retryable, vec!["conflict", "throttled", "down"]);
        assert_eq!(summary.failed, 5);
    }

    #[test]
    fn test_bulk_item_id() {
        let index = BulkItem::Index {
            id: None,
            body: Map::new(),
        };
        let update = BulkItem::Update {
            id: "x".to_string(),
            doc: Map::new(),
        };
        assert_eq!(index.id(), None);
        assert_eq!(update.id(), Some("x"));
    }
}
