//! # Geo Indexer Shared
//!
//! This crate defines the data structures shared across the geo indexer: the
//! in-memory entity model, the closed set of entity kinds, geometry value
//! types, the sparse document projection and the autocomplete suggestion
//! payload. Nothing in here performs I/O.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::entity::{Containment, GeoEntity, Params};
pub use types::geometry::{CenterPoint, Geometry};
pub use types::kind::EntityKind;
pub use types::projection::{Projection, GEOMETRY_FIELDS, SUGGEST_FIELD};
pub use types::suggestion::Suggestion;
