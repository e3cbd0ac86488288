//! In-process worker pool.
//!
//! A bounded channel feeds a fixed number of worker tasks. Recoverable
//! handler failures are retried with jittered exponential backoff; a task
//! that still fails is dead-lettered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};
use tracing::{debug, error, info, warn};

use crate::errors::GeoIndexError;
use crate::queue::{ReindexTask, TaskHandler, TaskQueue};

/// Configuration for the worker queue.
#[derive(Debug, Clone)]
pub struct WorkerQueueConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Tasks that may wait in the channel before `submit` blocks.
    pub capacity: usize,
    /// Attempts per task, including the first.
    pub max_attempts: usize,
    /// Base of the exponential backoff between attempts.
    pub backoff_base_millis: u64,
    /// Upper bound on a single backoff delay.
    pub max_backoff: Duration,
}

impl Default for WorkerQueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            capacity: 64,
            max_attempts: 3,
            backoff_base_millis: 10,
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Snapshot of the queue counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub submitted: u64,
    pub completed: u64,
    pub dead_lettered: u64,
    /// Handler invocations, retries included.
    pub attempts: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    dead_lettered: AtomicU64,
    attempts: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
        }
    }
}

pub struct WorkerQueue {
    sender: Mutex<Option<mpsc::Sender<ReindexTask>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl WorkerQueue {
    /// Spawn the workers. Must be called from within a tokio runtime.
    pub fn start(handler: Arc<dyn TaskHandler>, config: WorkerQueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel::<ReindexTask>(config.capacity.max(1));
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                let receiver = receiver.clone();
                let handler = handler.clone();
                let counters = counters.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    loop {
                        // Hold the lock only while waiting for the next task
                        let next = receiver.lock().await.recv().await;
                        let Some(task) = next else {
                            debug!(worker = worker, "Queue closed, worker exiting");
                            break;
                        };
                        run_task(handler.as_ref(), &task, &config, &counters).await;
                    }
                })
            })
            .collect();

        info!(
            workers = config.workers.max(1),
            capacity = config.capacity,
            max_attempts = config.max_attempts,
            "Worker queue started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            counters,
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }

    /// Stop accepting tasks and wait until every accepted task has finished.
    pub async fn shutdown(&self) -> QueueStats {
        let sender = self
            .sender
            .lock()
            .map(|mut guard| guard.take())
            .unwrap_or_default();
        drop(sender);

        let workers = self
            .workers
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default();
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "Worker task panicked");
            }
        }

        let stats = self.stats();
        info!(
            submitted = stats.submitted,
            completed = stats.completed,
            dead_lettered = stats.dead_lettered,
            attempts = stats.attempts,
            "Worker queue drained"
        );
        stats
    }
}

#[async_trait]
impl TaskQueue for WorkerQueue {
    async fn submit(&self, task: ReindexTask) -> Result<(), GeoIndexError> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| GeoIndexError::task_queue("queue state poisoned"))?
            .clone()
            .ok_or_else(|| GeoIndexError::task_queue("queue is shut down"))?;

        sender
            .send(task)
            .await
            .map_err(|_| GeoIndexError::task_queue("all workers have stopped"))?;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

async fn run_task(
    handler: &dyn TaskHandler,
    task: &ReindexTask,
    config: &WorkerQueueConfig,
    counters: &Counters,
) {
    let retry = ExponentialBackoff::from_millis(config.backoff_base_millis.max(1))
        .factor(2)
        .max_delay(config.max_backoff)
        .map(jitter)
        .take(config.max_attempts.saturating_sub(1));

    let result = RetryIf::start(
        retry,
        || {
            counters.attempts.fetch_add(1, Ordering::Relaxed);
            handler.handle(task)
        },
        |e: &GeoIndexError| {
            let recoverable = e.is_recoverable();
            if recoverable {
                warn!(task_id = %task.id, page = task.page, error = %e, "Task failed, retrying");
            }
            recoverable
        },
    )
    .await;

    match result {
        Ok(()) => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
            debug!(task_id = %task.id, page = task.page, "Task completed");
        }
        Err(e) => {
            counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
            error!(
                task_id = %task.id,
                kind = %task.kind,
                page = task.page,
                documents = task.len(),
                error = %e,
                "Task dead-lettered"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_indexer_repository::IndexStoreError;
    use geo_indexer_shared::EntityKind;
    use std::sync::atomic::AtomicUsize;

    /// Fails the first `failures` calls with the given error kind.
    struct FlakyHandler {
        calls: AtomicUsize,
        failures: usize,
        recoverable: bool,
    }

    impl FlakyHandler {
        fn new(failures: usize, recoverable: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
                recoverable,
            }
        }
    }

    #[async_trait]
    impl TaskHandler for FlakyHandler {
        async fn handle(&self, _task: &ReindexTask) -> Result<(), GeoIndexError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(if self.recoverable {
                    IndexStoreError::connection("refused").into()
                } else {
                    GeoIndexError::validation("bad page")
                });
            }
            Ok(())
        }
    }

    fn config(max_attempts: usize) -> WorkerQueueConfig {
        WorkerQueueConfig {
            workers: 2,
            capacity: 4,
            max_attempts,
            backoff_base_millis: 1,
            max_backoff: Duration::from_millis(5),
        }
    }

    fn task() -> ReindexTask {
        ReindexTask::new(EntityKind::Locality, 1, Vec::new())
    }

    #[tokio::test]
    async fn test_recoverable_failure_is_retried() {
        let handler = Arc::new(FlakyHandler::new(2, true));
        let queue = WorkerQueue::start(handler.clone(), config(3));

        queue.submit(task()).await.unwrap();
        let stats = queue.shutdown().await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.dead_lettered, 0);
        assert_eq!(stats.attempts, 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_dead_letter() {
        let handler = Arc::new(FlakyHandler::new(usize::MAX, true));
        let queue = WorkerQueue::start(handler.clone(), config(2));

        queue.submit(task()).await.unwrap();
        let stats = queue.shutdown().await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.dead_lettered, 1);
    }

    #[tokio::test]
    async fn test_unrecoverable_failure_is_not_retried() {
        let handler = Arc::new(FlakyHandler::new(usize::MAX, false));
        let queue = WorkerQueue::start(handler.clone(), config(5));

        queue.submit(task()).await.unwrap();
        let stats = queue.shutdown().await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stats.dead_lettered, 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_and_rejects_new_tasks() {
        let handler = Arc::new(FlakyHandler::new(0, true));
        let queue = WorkerQueue::start(handler.clone(), config(1));

        for _ in 0..10 {
            queue.submit(task()).await.unwrap();
        }
        let stats = queue.shutdown().await;

        assert_eq!(stats.submitted, 10);
        assert_eq!(stats.completed, 10);
        assert!(matches!(
            queue.submit(task()).await,
            Err(GeoIndexError::TaskQueueError(_))
        ));
    }
}
