//! Document projection.
//!
//! A [`Projection`] is the sparse body written to the index store together with
//! the store document id it belongs to.

use serde_json::{Map, Value};

use crate::types::suggestion::Suggestion;

/// Fields holding geometry, excluded from reindex updates unless geometry
/// refresh is requested.
pub const GEOMETRY_FIELDS: [&str; 3] = ["center_point", "center_shape", "boundaries"];

/// Key of the autocomplete payload in a stored document.
pub const SUGGEST_FIELD: &str = "suggest";

/// The persisted form of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Store document id, when the entity has been written before.
    pub id: Option<String>,
    /// Sparse document body. Never contains `id`.
    pub body: Map<String, Value>,
}

impl Projection {
    pub fn new(id: Option<String>, body: Map<String, Value>) -> Self {
        Self { id, body }
    }

    /// Inject the suggestion payload, if any, under `suggest`.
    pub fn with_suggestion(mut self, suggestion: Option<Suggestion>) -> Self {
        if let Some(suggestion) = suggestion {
            self.body
                .insert(SUGGEST_FIELD.to_string(), suggestion.to_value());
        }
        self
    }

    /// Set `suggest` unconditionally, writing `null` when there is none.
    pub fn replace_suggestion(mut self, suggestion: Option<Suggestion>) -> Self {
        let value = suggestion.map_or(Value::Null, |s| s.to_value());
        self.body.insert(SUGGEST_FIELD.to_string(), value);
        self
    }

    /// Remove every geometry field from the body.
    pub fn strip_geometries(mut self) -> Self {
        for field in GEOMETRY_FIELDS {
            self.body.remove(field);
        }
        self
    }

    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }
}
