//! Loader module for the geo indexer.
//!
//! Writes projected entities to the index store and reads them back.

use std::sync::Arc;

use geo_indexer_repository::{BatchOperationSummary, BulkItem, IndexDocumentRequest, IndexStore};
use geo_indexer_shared::{EntityKind, GeoEntity, Params};
use tracing::{debug, error, instrument, warn};

use crate::errors::GeoIndexError;
use crate::processor::EntityProcessor;

/// Loader that persists entities.
///
/// The loader is responsible for:
/// - Projecting entities into sparse documents with their suggestion
/// - Single and bulk writes
/// - Rehydrating entities from stored documents
pub struct EntityLoader {
    store: Arc<dyn IndexStore>,
    processor: Arc<EntityProcessor>,
}

impl EntityLoader {
    pub fn new(store: Arc<dyn IndexStore>, processor: Arc<EntityProcessor>) -> Self {
        Self { store, processor }
    }

    /// Write the entity as a full document.
    ///
    /// On first write the store assigns the id, which the entity keeps.
    pub async fn save(&self, entity: &mut GeoEntity) -> Result<String, GeoIndexError> {
        let projection = entity
            .project()
            .with_suggestion(entity.generate_suggestion());

        let request = IndexDocumentRequest {
            kind: entity.kind(),
            id: projection.id.clone(),
            body: projection.into_body(),
        };

        let id = self.store.index_document(&request).await?;
        entity.set_id(id.clone());

        debug!(kind = %entity.kind(), id = %id, "Entity saved");
        Ok(id)
    }

    /// Build, enrich and save one entity.
    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn create(&self, kind: EntityKind, params: &Params) -> Result<GeoEntity, GeoIndexError> {
        let mut entity = self.processor.build(kind, params).await?;
        self.save(&mut entity).await?;
        Ok(entity)
    }

    /// Build and enrich every parameter set and write them in one bulk request.
    #[instrument(skip_all, fields(kind = %kind, count = params.len()))]
    pub async fn create_many(
        &self,
        kind: EntityKind,
        params: &[Params],
    ) -> Result<BatchOperationSummary, GeoIndexError> {
        let mut items = Vec::with_capacity(params.len());
        for param in params {
            let entity = self.processor.build(kind, param).await?;
            let projection = entity
                .project()
                .with_suggestion(entity.generate_suggestion());
            items.push(BulkItem::Index {
                id: projection.id.clone(),
                body: projection.into_body(),
            });
        }

        let summary = self.store.bulk(kind, &items).await?;

        if summary.failed > 0 {
            warn!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Bulk create completed with some failures"
            );
            for result in summary.results.iter().filter(|r| !r.success) {
                if let Some(ref err) = result.error {
                    error!(id = ?result.id, error = %err, "Failed to create document");
                }
            }
        } else {
            debug!(count = summary.succeeded, "Created all documents");
        }

        Ok(summary)
    }

    /// Load a stored entity by id. A missing document yields `None`.
    pub async fn find(&self, kind: EntityKind, id: &str) -> Result<Option<GeoEntity>, GeoIndexError> {
        let Some(document) = self.store.get_document(kind, id).await? else {
            return Ok(None);
        };

        let mut entity = GeoEntity::with_id(kind, document.id);
        entity.merge(&document.source)?;
        Ok(Some(entity))
    }

    /// Merge new parameters into an entity without writing it.
    pub fn update(&self, entity: &mut GeoEntity, params: &Params) -> Result<(), GeoIndexError> {
        entity.merge(params)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{
        AdminNameResolver, ReferenceData, ReferenceMap, ReferenceTable, ShapeRanking,
        ShapeResolver,
    };
    use crate::testing::MockStore;
    use async_trait::async_trait;
    use geo_indexer_repository::opensearch::IndexConfig;
    use serde_json::json;

    struct EmptyReferenceData;

    #[async_trait]
    impl ReferenceData for EmptyReferenceData {
        async fn load(&self, _table: ReferenceTable) -> Result<ReferenceMap, GeoIndexError> {
            Ok(ReferenceMap::new())
        }
    }

    fn loader(store: Arc<MockStore>) -> EntityLoader {
        let processor = EntityProcessor::new(
            Arc::new(AdminNameResolver::new(Arc::new(EmptyReferenceData))),
            Arc::new(ShapeResolver::new(
                store.clone(),
                IndexConfig::default(),
                ShapeRanking::default(),
            )),
        );
        EntityLoader::new(store, Arc::new(processor))
    }

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_writes_suggestion() {
        let store = Arc::new(MockStore::new());
        let loader = loader(store.clone());
        let mut entity = GeoEntity::new(
            EntityKind::Locality,
            &params(json!({"name": "Example City", "population": 1200, "alternate_names": []})),
        )
        .unwrap();

        let id = loader.save(&mut entity).await.unwrap();
        assert_eq!(entity.id(), Some(id.as_str()));

        let indexed = store.indexed.lock().unwrap();
        assert_eq!(indexed[0].id, None);
        let body = &indexed[0].body;
        assert!(!body.contains_key("id"));
        assert!(!body.contains_key("alternate_names"));
        assert_eq!(body["suggest"]["weight"], 1200);
        assert_eq!(body["suggest"]["input"][0], "Example City");
    }

    #[tokio::test]
    async fn test_save_reuses_existing_id() {
        let store = Arc::new(MockStore::new());
        let loader = loader(store.clone());
        let mut entity = GeoEntity::with_id(EntityKind::Geoname, "5391959");
        entity.name = Some("San Francisco".to_string());

        loader.save(&mut entity).await.unwrap();

        let indexed = store.indexed.lock().unwrap();
        assert_eq!(indexed[0].id.as_deref(), Some("5391959"));
        // Geonames produce no suggestion
        assert!(!indexed[0].body.contains_key("suggest"));
    }

    #[tokio::test]
    async fn test_create_many_sends_one_bulk() {
        let store = Arc::new(MockStore::new());
        let loader = loader(store.clone());

        let summary = loader
            .create_many(
                EntityKind::Admin1,
                &[
                    params(json!({"id": "US.CA", "name": "California"})),
                    params(json!({"name": "Oregon"})),
                ],
            )
            .await
            .unwrap();

        assert_eq!(summary.total, 2);
        let bulks = store.bulks.lock().unwrap();
        assert_eq!(bulks.len(), 1);
        let (kind, items) = &bulks[0];
        assert_eq!(*kind, EntityKind::Admin1);
        assert_eq!(items[0].id(), Some("US.CA"));
        assert_eq!(items[1].id(), None);
    }

    #[tokio::test]
    async fn test_find_round_trips_through_store() {
        let store = Arc::new(MockStore::new());
        store.insert(
            EntityKind::Neighborhood,
            "nb-9",
            json!({"name": "Mission", "population": 60000, "suggest": {"input": ["Mission"]}}),
        );
        let loader = loader(store);

        let entity = loader
            .find(EntityKind::Neighborhood, "nb-9")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entity.id(), Some("nb-9"));
        assert_eq!(entity.name.as_deref(), Some("Mission"));
        assert_eq!(entity.population, Some(60000));

        assert!(loader
            .find(EntityKind::Neighborhood, "missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_merges_without_writing() {
        let store = Arc::new(MockStore::new());
        let loader = loader(store.clone());
        let mut entity = GeoEntity::with_id(EntityKind::Poi, "p1");

        loader
            .update(&mut entity, &params(json!({"name": "Ferry Building", "type": "street"})))
            .unwrap();

        assert_eq!(entity.name.as_deref(), Some("Ferry Building"));
        assert_eq!(entity.kind(), EntityKind::Poi);
        assert!(store.indexed.lock().unwrap().is_empty());
        assert!(store.updates.lock().unwrap().is_empty());
    }
}
