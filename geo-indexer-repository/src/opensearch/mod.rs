//! OpenSearch implementation of the index store.
//!
//! This module provides a concrete implementation of `IndexStore`
//! using OpenSearch as the backend.

mod index_config;
mod provider;

pub use index_config::{get_index_settings, IndexConfig, DEFAULT_INDEX_PREFIX};
pub use provider::OpenSearchStore;
