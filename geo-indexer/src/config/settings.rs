//! Runtime settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use geo_indexer_repository::config::DEFAULT_RETRY_ON_CONFLICT;
use geo_indexer_repository::opensearch::DEFAULT_INDEX_PREFIX;
use geo_indexer_repository::{IndexConfig, StoreConfig};
use geo_indexer_shared::EntityKind;
use tracing::warn;

use crate::errors::GeoIndexError;
use crate::queue::WorkerQueueConfig;
use crate::reindex::ReindexConfig;
use crate::resolver::ShapeRanking;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default directory holding the reference tables.
const DEFAULT_REFERENCE_DATA_DIR: &str = "data/geonames";

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection at a fixed interval until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Anything else falls back to "retry".
    fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("retry").to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Everything the indexer binary needs to wire itself up.
#[derive(Debug, Clone)]
pub struct Settings {
    pub opensearch_url: String,
    pub index: IndexConfig,
    pub store: StoreConfig,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub reference_data_dir: PathBuf,
    pub shape_ranking: ShapeRanking,
    pub reindex: ReindexConfig,
    pub queue: WorkerQueueConfig,
    /// Kinds walked by a full reindex run, in order.
    pub reindex_kinds: Vec<EntityKind>,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_PREFIX`: Prefix of the per-kind aliases (default: "pelias")
    /// - `INDEX_VERSION`: Version suffix of the physical indices (default: 0)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `STORE_TIMEOUT_SECS`: Timeout of single-document writes (default: 10)
    /// - `RETRY_ON_CONFLICT`: Version-conflict retries of partial updates (default: 5)
    /// - `MAX_BATCH_SIZE`: Bulk request limit, 0 disables it (default: 1000)
    /// - `REFERENCE_DATA_DIR`: Directory of the reference tables (default: data/geonames)
    /// - `SHAPE_RANKING`: store_default, population_desc or id_asc (default: population_desc)
    /// - `REINDEX_PAGE_SIZE`: Documents per scroll page (default: 50)
    /// - `REINDEX_SCROLL_KEEP_ALIVE`: Scroll context lifetime, e.g. "10m" (default: 10m)
    /// - `REINDEX_MAX_PAGES`: Page limit of one traversal (default: unlimited)
    /// - `REINDEX_KINDS`: Comma-separated kinds to reindex (default: all)
    /// - `QUEUE_WORKERS`: Concurrent reindex workers (default: 4)
    /// - `QUEUE_CAPACITY`: Pages waiting for a worker (default: 64)
    /// - `QUEUE_MAX_ATTEMPTS`: Attempts per page (default: 3)
    pub fn from_env() -> Result<Self, GeoIndexError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the raw value of a
    /// variable or `None` when it is unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GeoIndexError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let opensearch_url = get("OPENSEARCH_URL").unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string());
        let index = IndexConfig::new(
            get("INDEX_PREFIX").unwrap_or_else(|| DEFAULT_INDEX_PREFIX.to_string()),
            parse_number(&get, "INDEX_VERSION", 0u32)?,
        );

        let max_batch_size = parse_number(&get, "MAX_BATCH_SIZE", 1000usize)?;
        let retry_on_conflict = parse_number(&get, "RETRY_ON_CONFLICT", DEFAULT_RETRY_ON_CONFLICT)?;
        let store = StoreConfig {
            max_batch_size: (max_batch_size > 0).then_some(max_batch_size),
            request_timeout: Duration::from_secs(parse_number(&get, "STORE_TIMEOUT_SECS", 10u64)?),
            retry_on_conflict,
        };

        let shape_ranking = match get("SHAPE_RANKING") {
            Some(value) => value.parse()?,
            None => ShapeRanking::default(),
        };

        let keep_alive = match get("REINDEX_SCROLL_KEEP_ALIVE") {
            Some(value) => parse_duration(&value)?,
            None => Duration::from_secs(600),
        };
        let max_pages = get("REINDEX_MAX_PAGES")
            .map(|value| {
                value.trim().parse::<usize>().map_err(|_| {
                    GeoIndexError::config(format!("REINDEX_MAX_PAGES is not a number: '{}'", value))
                })
            })
            .transpose()?;
        let reindex = ReindexConfig {
            page_size: parse_number(&get, "REINDEX_PAGE_SIZE", 50usize)?,
            keep_alive,
            max_pages,
            retry_on_conflict,
        };

        let queue = WorkerQueueConfig {
            workers: parse_number(&get, "QUEUE_WORKERS", 4usize)?,
            capacity: parse_number(&get, "QUEUE_CAPACITY", 64usize)?,
            max_attempts: parse_number(&get, "QUEUE_MAX_ATTEMPTS", 3usize)?,
            ..WorkerQueueConfig::default()
        };

        let reindex_kinds = match get("REINDEX_KINDS") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<EntityKind>().map_err(GeoIndexError::from))
                .collect::<Result<Vec<_>, _>>()?,
            None => EntityKind::ALL.to_vec(),
        };

        Ok(Self {
            opensearch_url,
            index,
            store,
            connection_mode: ConnectionMode::parse(get("OPENSEARCH_CONNECTION_MODE").as_deref()),
            retry_interval: Duration::from_secs(parse_number(
                &get,
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )?),
            reference_data_dir: get("REFERENCE_DATA_DIR")
                .unwrap_or_else(|| DEFAULT_REFERENCE_DATA_DIR.to_string())
                .into(),
            shape_ranking,
            reindex,
            queue,
            reindex_kinds,
        })
    }
}

fn parse_number<T, G>(get: &G, key: &str, default: T) -> Result<T, GeoIndexError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| GeoIndexError::config(format!("{} is not a number: '{}'", key, value))),
        None => Ok(default),
    }
}

/// Parse a duration such as `"30s"`, `"10m"` or `"1h"`. A bare number is
/// read as seconds.
pub fn parse_duration(value: &str) -> Result<Duration, GeoIndexError> {
    let value = value.trim();
    let invalid = || GeoIndexError::config(format!("invalid duration '{}'", value));

    let (digits, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(split) => value.split_at(split),
        None => (value, "s"),
    };
    let amount: u64 = digits.parse().map_err(|_| invalid())?;

    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => return Err(invalid()),
    };
    let secs = amount.checked_mul(multiplier).ok_or_else(invalid)?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, GeoIndexError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]).unwrap();

        assert_eq!(settings.opensearch_url, "http://localhost:9200");
        assert_eq!(settings.index.prefix, DEFAULT_INDEX_PREFIX);
        assert_eq!(settings.index.version, 0);
        assert_eq!(settings.connection_mode, ConnectionMode::Retry);
        assert_eq!(settings.retry_interval, Duration::from_secs(15));
        assert_eq!(settings.store.max_batch_size, Some(1000));
        assert_eq!(settings.store.retry_on_conflict, 5);
        assert_eq!(settings.reindex.page_size, 50);
        assert_eq!(settings.reindex.keep_alive, Duration::from_secs(600));
        assert_eq!(settings.reindex.max_pages, None);
        assert_eq!(settings.reindex.retry_on_conflict, 5);
        assert_eq!(settings.shape_ranking, ShapeRanking::PopulationDesc);
        assert_eq!(settings.queue.workers, 4);
        assert_eq!(settings.reference_data_dir, PathBuf::from("data/geonames"));
        assert_eq!(settings.reindex_kinds.len(), EntityKind::ALL.len());
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("OPENSEARCH_URL", "http://search:9200"),
            ("INDEX_PREFIX", "places"),
            ("INDEX_VERSION", "3"),
            ("OPENSEARCH_CONNECTION_MODE", "Fail-Fast"),
            ("MAX_BATCH_SIZE", "0"),
            ("RETRY_ON_CONFLICT", "2"),
            ("SHAPE_RANKING", "id-asc"),
            ("REINDEX_PAGE_SIZE", "200"),
            ("REINDEX_SCROLL_KEEP_ALIVE", "1h"),
            ("REINDEX_MAX_PAGES", "7"),
            ("REINDEX_KINDS", "locality, neighborhood"),
            ("QUEUE_WORKERS", "8"),
        ])
        .unwrap();

        assert_eq!(settings.opensearch_url, "http://search:9200");
        assert_eq!(settings.index.alias(EntityKind::Locality), "places_locality");
        assert_eq!(settings.index.version, 3);
        assert_eq!(settings.connection_mode, ConnectionMode::FailFast);
        assert_eq!(settings.store.max_batch_size, None);
        assert_eq!(settings.store.retry_on_conflict, 2);
        assert_eq!(settings.reindex.retry_on_conflict, 2);
        assert_eq!(settings.shape_ranking, ShapeRanking::IdAsc);
        assert_eq!(settings.reindex.page_size, 200);
        assert_eq!(settings.reindex.keep_alive, Duration::from_secs(3600));
        assert_eq!(settings.reindex.max_pages, Some(7));
        assert_eq!(
            settings.reindex_kinds,
            vec![EntityKind::Locality, EntityKind::Neighborhood]
        );
        assert_eq!(settings.queue.workers, 8);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let settings = settings(&[("INDEX_PREFIX", "  "), ("REINDEX_MAX_PAGES", "")]).unwrap();
        assert_eq!(settings.index.prefix, "pelias");
        assert_eq!(settings.reindex.max_pages, None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            settings(&[("REINDEX_PAGE_SIZE", "lots")]),
            Err(GeoIndexError::ConfigError(_))
        ));
        assert!(matches!(
            settings(&[("SHAPE_RANKING", "largest")]),
            Err(GeoIndexError::ConfigError(_))
        ));
        assert!(settings(&[("REINDEX_KINDS", "locality,planet")]).is_err());
        assert!(settings(&[("REINDEX_SCROLL_KEEP_ALIVE", "10d")]).is_err());
    }

    #[test]
    fn test_unknown_connection_mode_falls_back_to_retry() {
        let settings = settings(&[("OPENSEARCH_CONNECTION_MODE", "sometimes")]).unwrap();
        assert_eq!(settings.connection_mode, ConnectionMode::Retry);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert!(parse_duration("m").is_err());
        assert!(parse_duration(&format!("{}h", u64::MAX / 60)).is_err());
        assert!(parse_duration(&format!("{}m", u64::MAX)).is_err());
        assert_eq!(
            parse_duration(&format!("{}s", u64::MAX)).unwrap(),
            Duration::from_secs(u64::MAX)
        );
        assert!(parse_duration("").is_err());
    }
}
