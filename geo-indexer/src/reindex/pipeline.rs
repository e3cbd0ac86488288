//! Reindex pipeline.
//!
//! Refreshes documents that are already stored: one entity at a time through
//! a partial update, or a whole kind by walking a scroll cursor and handing
//! every page to the task queue.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use geo_indexer_repository::config::DEFAULT_RETRY_ON_CONFLICT;
use geo_indexer_repository::{IndexStore, PartialUpdateRequest, Query, SearchRequest, SortClause};
use geo_indexer_shared::{EntityKind, GeoEntity};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::errors::GeoIndexError;
use crate::queue::{ReindexTask, TaskQueue};
use crate::resolver::ShapeResolver;

/// Configuration for the reindex pipeline.
#[derive(Debug, Clone)]
pub struct ReindexConfig {
    /// Documents per scroll page, and so per queued task.
    pub page_size: usize,
    /// How long the store keeps the scroll context between pages.
    pub keep_alive: Duration,
    /// Stop a traversal after this many pages. `None` walks to the end.
    pub max_pages: Option<usize>,
    /// Version-conflict retry budget of single-entity updates.
    pub retry_on_conflict: u32,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            keep_alive: Duration::from_secs(600),
            max_pages: None,
            retry_on_conflict: DEFAULT_RETRY_ON_CONFLICT,
        }
    }
}

/// What a single-entity reindex refreshes besides the suggestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexOptions {
    /// Keep `center_point`, `center_shape` and `boundaries` in the update.
    pub update_geometries: bool,
    /// Re-resolve enclosing shapes before projecting.
    pub set_shapes: bool,
}

/// Outcome of a full traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct ReindexSummary {
    pub kind: EntityKind,
    /// Pages dispatched to the queue.
    pub pages: usize,
    /// Documents across all dispatched pages.
    pub documents: usize,
    /// Whether the traversal stopped at `max_pages` before the cursor ran dry.
    pub truncated: bool,
    /// Whether [`ReindexPipeline::shutdown`] stopped the traversal.
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct ReindexPipeline {
    store: Arc<dyn IndexStore>,
    shapes: Arc<ShapeResolver>,
    queue: Arc<dyn TaskQueue>,
    config: ReindexConfig,
    shutdown_tx: watch::Sender<bool>,
}

impl ReindexPipeline {
    pub fn new(
        store: Arc<dyn IndexStore>,
        shapes: Arc<ShapeResolver>,
        queue: Arc<dyn TaskQueue>,
        config: ReindexConfig,
    ) -> Self {
        Self {
            store,
            shapes,
            queue,
            config,
            shutdown_tx: watch::Sender::new(false),
        }
    }

    pub fn config(&self) -> &ReindexConfig {
        &self.config
    }

    /// Stop running and future traversals. Pages already dispatched are not
    /// recalled, and the scroll context of the running traversal is cleared.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Rewrite a stored entity through a partial update.
    ///
    /// The suggestion is always recomputed and written, as `null` when the
    /// kind has none. Geometry is left out unless requested.
    #[instrument(skip(self, entity), fields(kind = %entity.kind(), id = ?entity.id()))]
    pub async fn reindex(
        &self,
        entity: &mut GeoEntity,
        options: ReindexOptions,
    ) -> Result<(), GeoIndexError> {
        let id = entity
            .id()
            .map(str::to_string)
            .ok_or_else(|| GeoIndexError::validation("cannot reindex an entity without id"))?;

        if options.set_shapes {
            self.shapes.set_encompassing_shapes(entity).await?;
        }

        let mut projection = entity.project();
        if !options.update_geometries {
            projection = projection.strip_geometries();
        }
        let doc = projection
            .replace_suggestion(entity.generate_suggestion())
            .into_body();

        self.store
            .update_document(&PartialUpdateRequest {
                kind: entity.kind(),
                id,
                doc,
                retry_on_conflict: self.config.retry_on_conflict,
            })
            .await?;

        debug!("Entity reindexed");
        Ok(())
    }

    /// Walk every document of `kind` in id order and queue one suggestion
    /// refresh task per page.
    ///
    /// Pages are dispatched without waiting for earlier ones to finish. The
    /// walk ends on the first empty page, at `max_pages` or on shutdown; the
    /// scroll context is released in every case.
    #[instrument(skip_all, fields(kind = %kind, page_size = self.config.page_size))]
    pub async fn reindex_all(&self, kind: EntityKind) -> Result<ReindexSummary, GeoIndexError> {
        let mut summary = ReindexSummary {
            kind,
            pages: 0,
            documents: 0,
            truncated: false,
            interrupted: false,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        let mut cursor: Option<String> = None;

        let outcome = self.traverse(kind, &mut cursor, &mut summary).await;

        if let Some(scroll_id) = cursor {
            if let Err(e) = self.store.clear_scroll(&scroll_id).await {
                warn!(error = %e, "Failed to clear scroll context");
            }
        }
        outcome?;

        summary.finished_at = Utc::now();
        info!(
            pages = summary.pages,
            documents = summary.documents,
            truncated = summary.truncated,
            interrupted = summary.interrupted,
            elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
            "Reindex traversal finished"
        );
        Ok(summary)
    }

    async fn traverse(
        &self,
        kind: EntityKind,
        cursor: &mut Option<String>,
        summary: &mut ReindexSummary,
    ) -> Result<(), GeoIndexError> {
        let keep_alive = self.config.keep_alive;
        let request = SearchRequest::new(Query::match_all())
            .with_size(self.config.page_size.max(1))
            .with_sort(vec![SortClause::asc("_id")]);

        let mut shutdown = self.shutdown_tx.subscribe();

        let Some(opened) =
            until_shutdown(&mut shutdown, self.store.open_scroll(kind, &request, keep_alive)).await
        else {
            summary.interrupted = true;
            return Ok(());
        };
        let mut page = opened?;
        info!(total = page.total, "Opened reindex cursor");

        loop {
            if page.scroll_id.is_some() {
                *cursor = page.scroll_id.clone();
            }
            if page.is_empty() {
                return Ok(());
            }
            if let Some(max_pages) = self.config.max_pages {
                if summary.pages >= max_pages {
                    warn!(max_pages = max_pages, "Reindex stopped at page limit");
                    summary.truncated = true;
                    return Ok(());
                }
            }

            let page_len = page.len();
            let task = ReindexTask::new(kind, summary.pages + 1, page.hits);
            debug!(task_id = %task.id, page = task.page, documents = page_len, "Dispatching page");
            match until_shutdown(&mut shutdown, self.queue.submit(task)).await {
                Some(submitted) => submitted?,
                None => {
                    summary.interrupted = true;
                    return Ok(());
                }
            }
            summary.pages += 1;
            summary.documents += page_len;

            let Some(scroll_id) = cursor.as_deref() else {
                warn!("Store returned no scroll id, stopping traversal");
                return Ok(());
            };
            match until_shutdown(&mut shutdown, self.store.scroll(scroll_id, keep_alive)).await {
                Some(next) => page = next?,
                None => {
                    summary.interrupted = true;
                    return Ok(());
                }
            }
        }
    }
}

/// Await `work` unless shutdown is requested first, in which case `None`.
async fn until_shutdown<T>(
    shutdown: &mut watch::Receiver<bool>,
    work: impl Future<Output = T>,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = shutdown.wait_for(|stop| *stop) => {
            warn!("Reindex traversal interrupted");
            None
        }
        out = work => Some(out),
    }
}
