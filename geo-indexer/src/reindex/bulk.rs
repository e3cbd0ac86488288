//! Suggestion-only bulk refresh of one page of stored documents.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use geo_indexer_repository::{BatchOperationSummary, BulkItem, IndexStore, IndexStoreError, SearchHit};
use geo_indexer_shared::{EntityKind, GeoEntity, SUGGEST_FIELD};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::errors::GeoIndexError;
use crate::queue::{ReindexTask, TaskHandler};

/// Recompute the suggestion of every hit and write them back in one bulk
/// request of partial updates keyed by the hits' store ids.
///
/// Hits whose source no longer parses as an entity are skipped. An empty page
/// sends nothing.
pub async fn reindex_bulk(
    store: &dyn IndexStore,
    kind: EntityKind,
    hits: &[SearchHit],
) -> Result<BatchOperationSummary, GeoIndexError> {
    let items: Vec<BulkItem> = hits
        .iter()
        .filter_map(|hit| match GeoEntity::new(kind, &hit.source) {
            Ok(entity) => {
                let mut doc = Map::new();
                doc.insert(
                    SUGGEST_FIELD.to_string(),
                    entity
                        .generate_suggestion()
                        .map_or(Value::Null, |s| s.to_value()),
                );
                Some(BulkItem::Update {
                    id: hit.id.clone(),
                    doc,
                })
            }
            Err(e) => {
                warn!(kind = %kind, id = %hit.id, error = %e, "Skipping unparseable document");
                None
            }
        })
        .collect();

    if items.is_empty() {
        return Ok(BatchOperationSummary::empty());
    }

    let summary = store.bulk(kind, &items).await?;
    debug!(
        kind = %kind,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Refreshed suggestions"
    );
    Ok(summary)
}

/// Runs [`reindex_bulk`] for queued reindex tasks.
///
/// Items rejected with a retryable status (409, 429, 5xx) fail the attempt
/// and are the only ones sent again. Other rejected items are logged and
/// dropped.
pub struct ReindexBulkHandler {
    store: Arc<dyn IndexStore>,
}

impl ReindexBulkHandler {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskHandler for ReindexBulkHandler {
    #[instrument(skip(self, task), fields(task_id = %task.id, kind = %task.kind, page = task.page))]
    async fn handle(&self, task: &ReindexTask) -> Result<(), GeoIndexError> {
        let hits = task.pending_hits();
        let summary = reindex_bulk(self.store.as_ref(), task.kind, &hits).await?;
        if summary.failed == 0 {
            return Ok(());
        }

        let (retryable, permanent): (Vec<_>, Vec<_>) = summary
            .results
            .iter()
            .filter(|r| !r.success)
            .partition(|r| r.is_retryable());

        for result in &permanent {
            warn!(
                id = ?result.id,
                status = result.status,
                error = ?result.error,
                "Dropping suggestion update rejected by the store"
            );
        }
        if retryable.is_empty() {
            return Ok(());
        }

        // Items without an id cannot be matched back to hits, so those keep the page whole
        let retry_ids: Option<HashSet<String>> = retryable.iter().map(|r| r.id.clone()).collect();
        if let Some(ids) = retry_ids {
            task.retain_pending(ids);
        }

        Err(IndexStoreError::bulk(format!(
            "{} of {} suggestion updates need a retry",
            retryable.len(),
            summary.total
        ))
        .into())
    }
}
