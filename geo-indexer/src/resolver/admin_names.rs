//! Administrative name resolution.
//!
//! Fills `country_name`, `admin1_name` and `admin2_name` from the reference
//! tables. Each table is loaded once per resolver and shared read-only by
//! every caller afterwards.

use std::sync::Arc;

use geo_indexer_shared::GeoEntity;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::errors::GeoIndexError;
use crate::resolver::reference_data::{ReferenceData, ReferenceMap, ReferenceTable};

pub struct AdminNameResolver {
    source: Arc<dyn ReferenceData>,
    countries: OnceCell<ReferenceMap>,
    admin1: OnceCell<ReferenceMap>,
    admin2: OnceCell<ReferenceMap>,
}

impl AdminNameResolver {
    pub fn new(source: Arc<dyn ReferenceData>) -> Self {
        Self {
            source,
            countries: OnceCell::new(),
            admin1: OnceCell::new(),
            admin2: OnceCell::new(),
        }
    }

    /// Get a table, loading it on first use.
    ///
    /// Concurrent first callers wait on a single load. A failed load is not
    /// cached; the next caller tries again.
    async fn table(&self, table: ReferenceTable) -> Result<&ReferenceMap, GeoIndexError> {
        let cell = match table {
            ReferenceTable::Countries => &self.countries,
            ReferenceTable::Admin1 => &self.admin1,
            ReferenceTable::Admin2 => &self.admin2,
        };

        cell.get_or_try_init(|| async {
            let entries = self.source.load(table).await?;
            info!(table = %table, entries = entries.len(), "Reference table cached");
            Ok(entries)
        })
        .await
    }

    async fn lookup(
        &self,
        table: ReferenceTable,
        key: &str,
    ) -> Result<Option<String>, GeoIndexError> {
        let name = self
            .table(table)
            .await?
            .get(key)
            .map(|entry| entry.name.clone());

        if name.is_none() {
            debug!(table = %table, key = %key, "No reference entry");
        }
        Ok(name)
    }

    /// Resolve the administrative names of `entity` from its codes.
    ///
    /// A code combination missing from its table leaves the corresponding
    /// name as it was.
    pub async fn set_admin_names(&self, entity: &mut GeoEntity) -> Result<(), GeoIndexError> {
        let Some(country) = entity.country_code.clone() else {
            return Ok(());
        };

        if let Some(name) = self.lookup(ReferenceTable::Countries, &country).await? {
            entity.country_name = Some(name);
        }

        let Some(admin1) = entity.admin1_code.clone() else {
            return Ok(());
        };
        let admin1_key = format!("{}.{}", country, admin1);
        if let Some(name) = self.lookup(ReferenceTable::Admin1, &admin1_key).await? {
            entity.admin1_name = Some(name);
        }

        let Some(admin2) = entity.admin2_code.clone() else {
            return Ok(());
        };
        let admin2_key = format!("{}.{}", admin1_key, admin2);
        if let Some(name) = self.lookup(ReferenceTable::Admin2, &admin2_key).await? {
            entity.admin2_name = Some(name);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::reference_data::ReferenceEntry;
    use async_trait::async_trait;
    use geo_indexer_shared::EntityKind;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves fixed tables and counts loads per table.
    struct MockReferenceData {
        country_loads: AtomicUsize,
        admin1_loads: AtomicUsize,
        admin2_loads: AtomicUsize,
        fail_countries: bool,
    }

    impl MockReferenceData {
        fn new() -> Self {
            Self {
                country_loads: AtomicUsize::new(0),
                admin1_loads: AtomicUsize::new(0),
                admin2_loads: AtomicUsize::new(0),
                fail_countries: false,
            }
        }
    }

    fn entries(rows: &[(&str, &str)]) -> ReferenceMap {
        rows.iter()
            .map(|(key, name)| {
                (
                    key.to_string(),
                    ReferenceEntry {
                        name: name.to_string(),
                    },
                )
            })
            .collect::<HashMap<_, _>>()
    }

    #[async_trait]
    impl ReferenceData for MockReferenceData {
        async fn load(&self, table: ReferenceTable) -> Result<ReferenceMap, GeoIndexError> {
            match table {
                ReferenceTable::Countries => {
                    self.country_loads.fetch_add(1, Ordering::SeqCst);
                    if self.fail_countries {
                        return Err(GeoIndexError::reference_data("countries.yml unreadable"));
                    }
                    Ok(entries(&[("US", "United States"), ("FR", "France")]))
                }
                ReferenceTable::Admin1 => {
                    self.admin1_loads.fetch_add(1, Ordering::SeqCst);
                    Ok(entries(&[("US.CA", "California")]))
                }
                ReferenceTable::Admin2 => {
                    self.admin2_loads.fetch_add(1, Ordering::SeqCst);
                    Ok(entries(&[("US.CA.075", "San Francisco County")]))
                }
            }
        }
    }

    fn entity(country: &str, admin1: Option<&str>, admin2: Option<&str>) -> GeoEntity {
        let mut entity = GeoEntity::empty(EntityKind::Locality);
        entity.country_code = Some(country.to_string());
        entity.admin1_code = admin1.map(str::to_string);
        entity.admin2_code = admin2.map(str::to_string);
        entity
    }

    #[tokio::test]
    async fn test_resolves_all_levels() {
        let resolver = AdminNameResolver::new(Arc::new(MockReferenceData::new()));
        let mut e = entity("US", Some("CA"), Some("075"));

        resolver.set_admin_names(&mut e).await.unwrap();

        assert_eq!(e.country_name.as_deref(), Some("United States"));
        assert_eq!(e.admin1_name.as_deref(), Some("California"));
        assert_eq!(e.admin2_name.as_deref(), Some("San Francisco County"));
    }

    #[tokio::test]
    async fn test_missing_key_leaves_name_untouched() {
        let resolver = AdminNameResolver::new(Arc::new(MockReferenceData::new()));
        let mut e = entity("FR", Some("11"), None);
        e.admin1_name = Some("Ile-de-France".to_string());

        resolver.set_admin_names(&mut e).await.unwrap();

        assert_eq!(e.country_name.as_deref(), Some("France"));
        assert_eq!(e.admin1_name.as_deref(), Some("Ile-de-France"));
        assert!(e.admin2_name.is_none());
    }

    #[tokio::test]
    async fn test_tables_only_loaded_when_codes_present() {
        let source = Arc::new(MockReferenceData::new());
        let resolver = AdminNameResolver::new(source.clone());
        let mut e = entity("US", None, None);

        resolver.set_admin_names(&mut e).await.unwrap();

        assert_eq!(source.country_loads.load(Ordering::SeqCst), 1);
        assert_eq!(source.admin1_loads.load(Ordering::SeqCst), 0);
        assert_eq!(source.admin2_loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_country_table_loaded_once() {
        let source = Arc::new(MockReferenceData::new());
        let resolver = AdminNameResolver::new(source.clone());

        let mut first = entity("US", Some("CA"), None);
        let mut second = entity("FR", None, None);
        resolver.set_admin_names(&mut first).await.unwrap();
        resolver.set_admin_names(&mut second).await.unwrap();

        assert_eq!(source.country_loads.load(Ordering::SeqCst), 1);
        assert_eq!(source.admin1_loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_loads_once() {
        let source = Arc::new(MockReferenceData::new());
        let resolver = Arc::new(AdminNameResolver::new(source.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move {
                    let mut e = entity("US", None, None);
                    resolver.set_admin_names(&mut e).await.unwrap();
                    e.country_name
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().as_deref(), Some("United States"));
        }
        assert_eq!(source.country_loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let source = Arc::new(MockReferenceData {
            fail_countries: true,
            ..MockReferenceData::new()
        });
        let resolver = AdminNameResolver::new(source.clone());
        let mut e = entity("US", None, None);

        assert!(resolver.set_admin_names(&mut e).await.is_err());
        assert!(resolver.set_admin_names(&mut e).await.is_err());
        assert_eq!(source.country_loads.load(Ordering::SeqCst), 2);
    }
}
