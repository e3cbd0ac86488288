//! This module defines the core data structures used across the geo indexer.

pub mod entity;
pub mod geometry;
pub mod kind;
pub mod projection;
pub mod suggestion;

pub use entity::GeoEntity;
pub use kind::EntityKind;
pub use projection::Projection;
pub use suggestion::Suggestion;
