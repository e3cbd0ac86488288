//! Typed query DSL.
//!
//! Covers the subset of the OpenSearch query language the geo indexer needs:
//! match and term queries, boolean composition, and geo-shape filters against
//! either an inline geometry or a shape stored on another document.

use geo_indexer_shared::Geometry;
use serde_json::{json, Map, Value};

/// Spatial relation evaluated by a geo-shape filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Intersects,
    Within,
    Contains,
    Disjoint,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Intersects => "intersects",
            Relation::Within => "within",
            Relation::Contains => "contains",
            Relation::Disjoint => "disjoint",
        }
    }
}

/// The shape a geo-shape filter is evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeRef {
    /// A geometry supplied in the request.
    Inline(Geometry),
    /// A geometry stored in a field of another indexed document.
    Indexed {
        index: String,
        id: String,
        path: String,
    },
}

/// A search query.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    Match {
        field: String,
        value: String,
    },
    Term {
        field: String,
        value: Value,
    },
    Bool {
        must: Vec<Query>,
        should: Vec<Query>,
        filter: Vec<Query>,
    },
    GeoShape {
        field: String,
        shape: ShapeRef,
        relation: Relation,
    },
}

impl Query {
    pub fn match_all() -> Self {
        Query::MatchAll
    }

    pub fn matches(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Match {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn bool(must: Vec<Query>, should: Vec<Query>, filter: Vec<Query>) -> Self {
        Query::Bool {
            must,
            should,
            filter,
        }
    }

    /// Match everything that passes a single filter.
    pub fn filtered(filter: Query) -> Self {
        Query::bool(vec![Query::MatchAll], Vec::new(), vec![filter])
    }

    pub fn geo_shape(field: impl Into<String>, shape: ShapeRef, relation: Relation) -> Self {
        Query::GeoShape {
            field: field.into(),
            shape,
            relation,
        }
    }

    /// Render the query as OpenSearch JSON.
    pub fn to_value(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Match { field, value } => json!({ "match": { field.as_str(): value } }),
            Query::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Query::Bool {
                must,
                should,
                filter,
            } => {
                let mut clauses = Map::new();
                for (key, queries) in [("must", must), ("should", should), ("filter", filter)] {
                    if !queries.is_empty() {
                        clauses.insert(
                            key.to_string(),
                            Value::Array(queries.iter().map(Query::to_value).collect()),
                        );
                    }
                }
                json!({ "bool": clauses })
            }
            Query::GeoShape {
                field,
                shape,
                relation,
            } => {
                let shape_clause = match shape {
                    ShapeRef::Inline(geometry) => json!({
                        "shape": geometry.as_value(),
                        "relation": relation.as_str(),
                    }),
                    ShapeRef::Indexed { index, id, path } => json!({
                        "indexed_shape": {
                            "index": index,
                            "id": id,
                            "path": path,
                        },
                        "relation": relation.as_str(),
                    }),
                };
                json!({ "geo_shape": { field.as_str(): shape_clause } })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    pub field: String,
    pub order: SortOrder,
}

impl SortClause {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    fn to_value(&self) -> Value {
        let order = match self.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        json!({ self.field.as_str(): { "order": order } })
    }
}

/// A search request: query, page size and explicit ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Query,
    pub size: Option<usize>,
    pub sort: Vec<SortClause>,
}

impl SearchRequest {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            size: None,
            sort: Vec::new(),
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortClause>) -> Self {
        self.sort = sort;
        self
    }

    /// Render the request body.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), self.query.to_value());
        if let Some(size) = self.size {
            body.insert("size".to_string(), json!(size));
        }
        if !self.sort.is_empty() {
            body.insert(
                "sort".to_string(),
                Value::Array(self.sort.iter().map(SortClause::to_value).collect()),
            );
        }
        Value::Object(body)
    }
}
