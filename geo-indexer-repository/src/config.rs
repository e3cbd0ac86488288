//! Configuration types for index store implementations.

use std::time::Duration;

/// Default number of times a partial update is retried on version conflict.
pub const DEFAULT_RETRY_ON_CONFLICT: u32 = 5;

/// Configuration shared by index store implementations.
///
/// Controls batch limits, request timeouts and the optimistic-concurrency
/// retry budget of partial updates.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of items allowed in a single bulk request.
    ///
    /// Set to `None` to disable the limit (not recommended for production).
    /// Defaults to 1000 if not specified.
    pub max_batch_size: Option<usize>,

    /// Timeout applied to single-document writes.
    pub request_timeout: Duration,

    /// How many times the store retries a partial update that hits a
    /// version conflict before giving up.
    pub retry_on_conflict: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Some(1000),
            request_timeout: Duration::from_secs(10),
            retry_on_conflict: DEFAULT_RETRY_ON_CONFLICT,
        }
    }
}

impl StoreConfig {
    /// Create a config with no batch size limit.
    ///
    /// # Warning
    ///
    /// Use with caution. Removing batch size limits can lead to memory issues
    /// and timeouts when processing very large batches.
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
            ..Self::default()
        }
    }

    /// Create a config with a custom batch size limit.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
            ..Self::default()
        }
    }

    /// Timeout formatted the way the store expects it (e.g. `"10s"`).
    pub fn timeout_param(&self) -> String {
        format!("{}s", self.request_timeout.as_secs().max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.max_batch_size, Some(1000));
        assert_eq!(config.retry_on_conflict, 5);
        assert_eq!(config.timeout_param(), "10s");
    }

    #[test]
    fn test_sub_second_timeout_rounds_up() {
        let config = StoreConfig {
            request_timeout: Duration::from_millis(200),
            ..StoreConfig::default()
        };
        assert_eq!(config.timeout_param(), "1s");
    }
}
