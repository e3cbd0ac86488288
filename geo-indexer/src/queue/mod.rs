//! Task queue for reindex batches.
//!
//! The reindex pipeline hands each scroll page to a [`TaskQueue`] and moves
//! on without waiting. Tasks run at least once and in no particular order.

mod worker;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use geo_indexer_repository::SearchHit;
use geo_indexer_shared::EntityKind;
use uuid::Uuid;

use crate::errors::GeoIndexError;

pub use worker::{QueueStats, WorkerQueue, WorkerQueueConfig};

/// One page of stored documents whose suggestions need refreshing.
#[derive(Debug, Clone)]
pub struct ReindexTask {
    /// Correlates log lines of the same task across retries.
    pub id: Uuid,
    pub kind: EntityKind,
    /// Position of the page in its traversal, starting at 1.
    pub page: usize,
    pub hits: Vec<SearchHit>,
    /// Ids still to be written. `None` until an attempt narrows it.
    pending: Arc<Mutex<Option<HashSet<String>>>>,
}

impl ReindexTask {
    pub fn new(kind: EntityKind, page: usize, hits: Vec<SearchHit>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            page,
            hits,
            pending: Arc::default(),
        }
    }

    /// Hits the next attempt has to write.
    pub fn pending_hits(&self) -> Vec<SearchHit> {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.as_ref() {
            Some(ids) => self
                .hits
                .iter()
                .filter(|hit| ids.contains(&hit.id))
                .cloned()
                .collect(),
            None => self.hits.clone(),
        }
    }

    /// Restrict later attempts to `ids`.
    pub fn retain_pending(&self, ids: HashSet<String>) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(ids);
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Accepts tasks for asynchronous execution.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a task. Returns once the task is accepted, not once it ran.
    async fn submit(&self, task: ReindexTask) -> Result<(), GeoIndexError>;
}

/// Executes one task.
///
/// Errors for which [`GeoIndexError::is_recoverable`] holds are retried by
/// the queue; others fail the task immediately.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &ReindexTask) -> Result<(), GeoIndexError>;
}
