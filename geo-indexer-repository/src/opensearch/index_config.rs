//! OpenSearch index configuration and mappings.
//!
//! Every entity kind gets its own versioned index (`pelias_locality_v0`)
//! behind a stable alias (`pelias_locality`). All reads and writes go through
//! the alias so a reindex into a new version can be swapped in atomically.

use geo_indexer_shared::EntityKind;
use serde_json::{json, Value};

/// Default prefix shared by every index name.
pub const DEFAULT_INDEX_PREFIX: &str = "pelias";

/// Configuration for the per-kind indices.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Prefix of every alias and index name.
    pub prefix: String,
    /// The version number for the indices (e.g., 0 for "pelias_locality_v0").
    pub version: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_PREFIX, 0)
    }
}

impl IndexConfig {
    /// Create a new index configuration.
    ///
    /// # Arguments
    ///
    /// * `prefix` - The prefix of every alias and index name
    /// * `version` - The version number
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        Self {
            prefix: prefix.into(),
            version,
        }
    }

    /// The alias all operations on `kind` are addressed to.
    pub fn alias(&self, kind: EntityKind) -> String {
        format!("{}_{}", self.prefix, kind.as_str())
    }

    /// The physical index behind the alias of `kind`.
    pub fn versioned_index_name(&self, kind: EntityKind) -> String {
        format!("{}_v{}", self.alias(kind), self.version)
    }
}

/// Get the index settings and mappings for one entity kind.
///
/// All kinds share the same field set. The mapping includes:
/// - **geo_point / geo_shape**: `center_point`, `center_shape` and `boundaries`
/// - **text with raw keyword**: the entity name and every denormalized admin name
/// - **keyword**: codes, used for exact filtering
/// - **completion**: the `suggest` field written by the reindex pipeline
///
/// # Sharding Configuration
///
/// - 1 primary shard
/// - 1 replica for redundancy
pub fn get_index_settings(_kind: EntityKind) -> Value {
    let named_text = json!({
        "type": "text",
        "fields": {
            "raw": {
                "type": "keyword"
            }
        }
    });

    let mut properties = json!({
        "name": named_text,
        "alternate_names": {
            "type": "text"
        },
        "feature_class": {
            "type": "keyword"
        },
        "country_code": {
            "type": "keyword"
        },
        "country_name": named_text,
        "admin1_code": {
            "type": "keyword"
        },
        "admin1_name": named_text,
        "admin2_code": {
            "type": "keyword"
        },
        "admin2_name": named_text,
        "population": {
            "type": "long"
        },
        "center_point": {
            "type": "geo_point"
        },
        "center_shape": {
            "type": "geo_shape"
        },
        "boundaries": {
            "type": "geo_shape"
        },
        "suggest": {
            "type": "completion"
        }
    });

    if let Some(fields) = properties.as_object_mut() {
        for kind in EntityKind::CONTAINMENT_ORDER {
            let prefix = kind.as_str();
            fields.insert(format!("{prefix}_id"), json!({ "type": "keyword" }));
            fields.insert(format!("{prefix}_name"), named_text.clone());
            fields.insert(format!("{prefix}_alternate_names"), json!({ "type": "text" }));
            fields.insert(format!("{prefix}_population"), json!({ "type": "long" }));
        }
    }

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "properties": properties
        }
    })
}
