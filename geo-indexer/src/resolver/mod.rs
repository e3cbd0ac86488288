//! Enrichment of entities from reference tables and enclosing shapes.

pub mod admin_names;
pub mod reference_data;
pub mod shapes;

pub use admin_names::AdminNameResolver;
pub use reference_data::{
    ReferenceData, ReferenceEntry, ReferenceMap, ReferenceTable, YamlReferenceData,
};
pub use shapes::{ShapeRanking, ShapeResolver, SHARED_ADMIN_FIELDS};
