//! Shape containment resolution.
//!
//! Finds the administrative shapes that enclose an entity by asking the index
//! store for intersecting `boundaries`, and copies the attributes of each hit
//! onto the entity. Intersection itself is always evaluated by the store.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use geo_indexer_repository::opensearch::IndexConfig;
use geo_indexer_repository::{
    IndexStore, Query, Relation, SearchHit, SearchRequest, ShapeRef, SortClause,
};
use geo_indexer_shared::{EntityKind, GeoEntity, Params};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::errors::GeoIndexError;

/// Administrative fields every containment hit carries down to the entity.
pub const SHARED_ADMIN_FIELDS: [&str; 6] = [
    "country_code",
    "country_name",
    "admin1_code",
    "admin1_name",
    "admin2_code",
    "admin2_name",
];

/// Feature class of GeoNames populated places.
const POPULATED_PLACE_CLASS: &str = "P";

/// Which intersecting shape wins when several enclose the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeRanking {
    /// Whatever the store returns first.
    StoreDefault,
    /// Most populous shape first, ties broken by id.
    #[default]
    PopulationDesc,
    /// Lowest id first.
    IdAsc,
}

impl ShapeRanking {
    pub fn sort_clauses(&self) -> Vec<SortClause> {
        match self {
            ShapeRanking::StoreDefault => Vec::new(),
            ShapeRanking::PopulationDesc => {
                vec![SortClause::desc("population"), SortClause::asc("_id")]
            }
            ShapeRanking::IdAsc => vec![SortClause::asc("_id")],
        }
    }
}

impl fmt::Display for ShapeRanking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeRanking::StoreDefault => "store_default",
            ShapeRanking::PopulationDesc => "population_desc",
            ShapeRanking::IdAsc => "id_asc",
        };
        f.write_str(name)
    }
}

impl FromStr for ShapeRanking {
    type Err = GeoIndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "store_default" => Ok(ShapeRanking::StoreDefault),
            "population_desc" => Ok(ShapeRanking::PopulationDesc),
            "id_asc" => Ok(ShapeRanking::IdAsc),
            other => Err(GeoIndexError::config(format!(
                "unknown shape ranking '{}'",
                other
            ))),
        }
    }
}

pub struct ShapeResolver {
    store: Arc<dyn IndexStore>,
    index_config: IndexConfig,
    ranking: ShapeRanking,
}

impl ShapeResolver {
    pub fn new(store: Arc<dyn IndexStore>, index_config: IndexConfig, ranking: ShapeRanking) -> Self {
        Self {
            store,
            index_config,
            ranking,
        }
    }

    pub fn ranking(&self) -> ShapeRanking {
        self.ranking
    }

    /// The best-ranked shape of `kind` whose boundaries intersect the entity.
    ///
    /// Returns `None` without querying when the entity has no location.
    pub async fn encompassing_shape(
        &self,
        entity: &GeoEntity,
        kind: EntityKind,
    ) -> Result<Option<SearchHit>, GeoIndexError> {
        let Some(shape) = entity.shape_for_containment() else {
            debug!(kind = %kind, "Entity has no location, skipping containment lookup");
            return Ok(None);
        };

        let request = SearchRequest::new(Query::filtered(Query::geo_shape(
            "boundaries",
            ShapeRef::Inline(shape),
            Relation::Intersects,
        )))
        .with_size(1)
        .with_sort(self.ranking.sort_clauses());

        let page = self.store.search(kind, &request).await?;
        Ok(page.hits.into_iter().next())
    }

    /// Copy the attributes of every enclosing local admin, locality and
    /// neighborhood onto the entity.
    ///
    /// Kinds are visited in containment order and the entity's own kind is
    /// skipped. Shared admin fields come from the last hit, so a neighborhood
    /// overrides a locality, which overrides a local admin.
    #[instrument(skip(self, entity), fields(kind = %entity.kind()))]
    pub async fn set_encompassing_shapes(&self, entity: &mut GeoEntity) -> Result<(), GeoIndexError> {
        let mut params = Params::new();

        for kind in EntityKind::CONTAINMENT_ORDER {
            if entity.kind() == kind {
                continue;
            }
            let Some(hit) = self.encompassing_shape(entity, kind).await? else {
                continue;
            };

            let prefix = kind.as_str();
            let field = |name: &str| hit.source.get(name).cloned().unwrap_or(Value::Null);

            params.insert(format!("{prefix}_id"), Value::String(hit.id.clone()));
            params.insert(format!("{prefix}_name"), field("name"));
            params.insert(format!("{prefix}_alternate_names"), field("alternate_names"));
            params.insert(format!("{prefix}_population"), field("population"));
            for shared in SHARED_ADMIN_FIELDS {
                params.insert(shared.to_string(), field(shared));
            }

            debug!(containing_kind = %kind, id = %hit.id, "Found encompassing shape");
        }

        entity.merge(&params)?;
        Ok(())
    }

    /// A representative GeoNames point inside the entity's boundaries.
    ///
    /// Prefers a populated place sharing the entity's name and falls back to
    /// any point within the boundaries. Failures resolve to `None`.
    pub async fn closest_geoname(&self, entity: &GeoEntity) -> Option<GeoEntity> {
        match self.try_closest_geoname(entity).await {
            Ok(geoname) => geoname,
            Err(e) => {
                warn!(
                    kind = %entity.kind(),
                    id = ?entity.id(),
                    error = %e,
                    "Closest geoname lookup failed"
                );
                None
            }
        }
    }

    async fn try_closest_geoname(
        &self,
        entity: &GeoEntity,
    ) -> Result<Option<GeoEntity>, GeoIndexError> {
        let Some(boundaries) = entity.boundaries.clone() else {
            return Ok(None);
        };
        let within = Query::geo_shape(
            "center_shape",
            ShapeRef::Inline(boundaries),
            Relation::Intersects,
        );

        let mut hits = Vec::new();
        if let Some(name) = entity.name.as_deref().filter(|n| !n.is_empty()) {
            let request = SearchRequest::new(Query::bool(
                vec![Query::matches("name", name)],
                vec![Query::matches("feature_class", POPULATED_PLACE_CLASS)],
                vec![within.clone()],
            ));
            hits = self.store.search(EntityKind::Geoname, &request).await?.hits;
        }

        if hits.is_empty() {
            let request = SearchRequest::new(Query::filtered(within));
            hits = self.store.search(EntityKind::Geoname, &request).await?.hits;
        }

        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        let mut geoname = GeoEntity::with_id(EntityKind::Geoname, hit.id);
        geoname.merge(&hit.source)?;
        Ok(Some(geoname))
    }

    /// Documents of `kind` whose center lies within this entity's stored
    /// boundaries.
    pub async fn contained_entities(
        &self,
        entity: &GeoEntity,
        kind: EntityKind,
        size: usize,
    ) -> Result<Vec<SearchHit>, GeoIndexError> {
        let id = entity
            .id()
            .ok_or_else(|| GeoIndexError::validation("contained entities require a stored entity"))?;

        let request = SearchRequest::new(Query::filtered(Query::geo_shape(
            "center_shape",
            ShapeRef::Indexed {
                index: self.index_config.alias(entity.kind()),
                id: id.to_string(),
                path: "boundaries".to_string(),
            },
            Relation::Intersects,
        )))
        .with_size(size);

        Ok(self.store.search(kind, &request).await?.hits)
    }
}
