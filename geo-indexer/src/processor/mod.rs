//! Processor module for the geo indexer.
//!
//! Builds entities from raw parameters and enriches them before they are
//! written.

mod entity_processor;

pub use entity_processor::EntityProcessor;
