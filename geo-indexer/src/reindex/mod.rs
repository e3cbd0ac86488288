//! Reindexing of stored documents.

mod bulk;
mod pipeline;

pub use bulk::{reindex_bulk, ReindexBulkHandler};
pub use pipeline::{ReindexConfig, ReindexOptions, ReindexPipeline, ReindexSummary};
