//! Entity processor implementation.
//!
//! Turns a parameter mapping into an enriched [`GeoEntity`]. Street-level
//! entities get their enclosing shapes; everything else gets its
//! administrative names resolved.

use std::sync::Arc;

use geo_indexer_shared::{EntityKind, GeoEntity, Params};
use tracing::{debug, instrument};

use crate::errors::GeoIndexError;
use crate::resolver::{AdminNameResolver, ShapeResolver};

pub struct EntityProcessor {
    admin_names: Arc<AdminNameResolver>,
    shapes: Arc<ShapeResolver>,
}

impl EntityProcessor {
    pub fn new(admin_names: Arc<AdminNameResolver>, shapes: Arc<ShapeResolver>) -> Self {
        Self { admin_names, shapes }
    }

    pub fn shapes(&self) -> &Arc<ShapeResolver> {
        &self.shapes
    }

    /// Construct an entity of `kind` and enrich it.
    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn build(&self, kind: EntityKind, params: &Params) -> Result<GeoEntity, GeoIndexError> {
        let mut entity = GeoEntity::new(kind, params)?;
        self.enrich(&mut entity).await?;
        Ok(entity)
    }

    /// Run the enrichment step that applies to the entity's kind.
    pub async fn enrich(&self, entity: &mut GeoEntity) -> Result<(), GeoIndexError> {
        if entity.is_street_level() {
            debug!("Resolving encompassing shapes");
            self.shapes.set_encompassing_shapes(entity).await
        } else {
            debug!("Resolving admin names");
            self.admin_names.set_admin_names(entity).await
        }
    }
}
