//! Reference data collaborator.
//!
//! Static code-to-name tables for countries and administrative subdivisions,
//! loaded from the GeoNames YAML exports.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::GeoIndexError;

/// One of the three reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceTable {
    /// Keyed by `country_code`.
    Countries,
    /// Keyed by `"country_code.admin1_code"`.
    Admin1,
    /// Keyed by `"country_code.admin1_code.admin2_code"`.
    Admin2,
}

impl ReferenceTable {
    pub fn file_name(&self) -> &'static str {
        match self {
            ReferenceTable::Countries => "countries.yml",
            ReferenceTable::Admin1 => "admin1.yml",
            ReferenceTable::Admin2 => "admin2.yml",
        }
    }
}

impl fmt::Display for ReferenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceTable::Countries => "countries",
            ReferenceTable::Admin1 => "admin1",
            ReferenceTable::Admin2 => "admin2",
        };
        f.write_str(name)
    }
}

/// A reference table row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferenceEntry {
    /// Display name. The exports use Ruby-style symbol keys (`:name:`).
    #[serde(alias = ":name")]
    pub name: String,
}

pub type ReferenceMap = HashMap<String, ReferenceEntry>;

/// Source of the reference tables.
#[async_trait]
pub trait ReferenceData: Send + Sync {
    /// Load one table in full.
    async fn load(&self, table: ReferenceTable) -> Result<ReferenceMap, GeoIndexError>;
}

/// Reads `countries.yml`, `admin1.yml` and `admin2.yml` from a directory.
pub struct YamlReferenceData {
    dir: PathBuf,
}

impl YamlReferenceData {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ReferenceData for YamlReferenceData {
    async fn load(&self, table: ReferenceTable) -> Result<ReferenceMap, GeoIndexError> {
        let path = self.dir.join(table.file_name());
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            GeoIndexError::reference_data(format!("reading {}: {}", path.display(), e))
        })?;

        let entries: ReferenceMap = serde_yaml::from_str(&raw).map_err(|e| {
            GeoIndexError::reference_data(format!("parsing {}: {}", path.display(), e))
        })?;

        debug!(table = %table, entries = entries.len(), "Loaded reference table");
        Ok(entries)
    }
}
