//! Dependency initialization and wiring for the geo indexer.

use std::sync::Arc;
use std::time::Duration;

use geo_indexer_repository::{IndexConfig, IndexStore, OpenSearchStore, StoreConfig};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{ConnectionMode, Settings};
use crate::errors::GeoIndexError;
use crate::loader::EntityLoader;
use crate::processor::EntityProcessor;
use crate::queue::WorkerQueue;
use crate::reindex::{ReindexBulkHandler, ReindexPipeline};
use crate::resolver::{AdminNameResolver, ShapeResolver, YamlReferenceData};

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub settings: Settings,
    pub store: Arc<dyn IndexStore>,
    pub loader: EntityLoader,
    pub pipeline: ReindexPipeline,
    /// Runs the pages the pipeline dispatches. Shut it down to wait for them.
    pub queue: Arc<WorkerQueue>,
}

impl Dependencies {
    /// Connect to OpenSearch, make sure every index exists and wire the
    /// resolvers, loader, queue and pipeline on top of it.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(GeoIndexError)` - If initialization fails (connection errors only in fail-fast mode)
    pub async fn new(settings: Settings) -> Result<Self, GeoIndexError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            index_prefix = %settings.index.prefix,
            index_version = settings.index.version,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            shape_ranking = %settings.shape_ranking,
            "Initializing dependencies"
        );

        let store = Self::connect_to_opensearch(
            &settings.opensearch_url,
            settings.index.clone(),
            settings.store.clone(),
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!("OpenSearch connection established");

        store
            .ensure_index_exists()
            .await
            .map_err(|e| GeoIndexError::config(format!("Failed to ensure indices exist: {}", e)))?;

        let store: Arc<dyn IndexStore> = Arc::new(store);
        Ok(Self::wire(settings, store))
    }

    /// Build the component graph on an already connected store.
    ///
    /// Must be called from within a tokio runtime, since it starts the
    /// worker queue.
    pub fn wire(settings: Settings, store: Arc<dyn IndexStore>) -> Self {
        let reference_data = Arc::new(YamlReferenceData::new(settings.reference_data_dir.clone()));
        let admin_names = Arc::new(AdminNameResolver::new(reference_data));
        let shapes = Arc::new(ShapeResolver::new(
            store.clone(),
            settings.index.clone(),
            settings.shape_ranking,
        ));

        let processor = Arc::new(EntityProcessor::new(admin_names, shapes.clone()));
        let loader = EntityLoader::new(store.clone(), processor);

        let handler = Arc::new(ReindexBulkHandler::new(store.clone()));
        let queue = Arc::new(WorkerQueue::start(handler, settings.queue.clone()));
        let pipeline = ReindexPipeline::new(
            store.clone(),
            shapes,
            queue.clone(),
            settings.reindex.clone(),
        );

        Self {
            settings,
            store,
            loader,
            pipeline,
            queue,
        }
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    async fn connect_to_opensearch(
        url: &str,
        index_config: IndexConfig,
        store_config: StoreConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchStore, GeoIndexError> {
        loop {
            match OpenSearchStore::new(url, index_config.clone(), store_config.clone()).await {
                Ok(store) => return Ok(store),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(GeoIndexError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}
