//! # Geo Indexer
//!
//! Indexer for geographic entities: builds places from parameter mappings,
//! enriches them with enclosing shapes or administrative names, and keeps
//! their OpenSearch documents and autocomplete suggestions fresh.
//!
//! ## Architecture
//!
//! 1. **Resolver**: Fills containment from enclosing shapes and admin names
//!    from reference tables
//! 2. **Processor**: Builds an entity and runs the enrichment for its kind
//! 3. **Loader**: Writes projected entities to the index store
//! 4. **Reindex**: Walks stored documents page by page and hands each page
//!    to the **Queue** for a suggestion refresh
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`resolver`]: Shape containment and admin name resolution
//! - [`processor`]: Entity construction and enrichment
//! - [`loader`]: Document writes and reads
//! - [`queue`]: In-process worker pool for reindex pages
//! - [`reindex`]: Single-entity and full-kind reindexing
//! - [`errors`]: Error types for the indexer

pub mod config;
pub mod errors;
pub mod loader;
pub mod processor;
pub mod queue;
pub mod reindex;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use config::{Dependencies, Settings};
pub use errors::GeoIndexError;
