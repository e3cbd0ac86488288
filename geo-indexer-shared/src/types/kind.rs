//! Entity kinds.
//!
//! Every geographic entity belongs to exactly one kind. The kind decides which
//! index the entity lives in, whether it is enriched through shape containment
//! or through the administrative reference tables, and how its autocomplete
//! suggestion is built.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// The closed set of geographic entity kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A GeoNames point feature.
    Geoname,
    /// First-level administrative division (state, province).
    Admin1,
    /// Second-level administrative division (county).
    Admin2,
    /// Local administrative area (township, municipality).
    LocalAdmin,
    /// City, town or village boundary.
    Locality,
    /// Neighborhood boundary.
    Neighborhood,
    /// A named street.
    Street,
    /// A street address.
    Address,
    /// A point of interest.
    Poi,
}

impl EntityKind {
    /// Every kind, in declaration order.
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Geoname,
        EntityKind::Admin1,
        EntityKind::Admin2,
        EntityKind::LocalAdmin,
        EntityKind::Locality,
        EntityKind::Neighborhood,
        EntityKind::Street,
        EntityKind::Address,
        EntityKind::Poi,
    ];

    /// Shape kinds consulted during containment resolution. Later kinds take
    /// precedence for the shared administrative fields.
    pub const CONTAINMENT_ORDER: [EntityKind; 3] = [
        EntityKind::LocalAdmin,
        EntityKind::Locality,
        EntityKind::Neighborhood,
    ];

    /// The store type name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Geoname => "geoname",
            EntityKind::Admin1 => "admin1",
            EntityKind::Admin2 => "admin2",
            EntityKind::LocalAdmin => "local_admin",
            EntityKind::Locality => "locality",
            EntityKind::Neighborhood => "neighborhood",
            EntityKind::Street => "street",
            EntityKind::Address => "address",
            EntityKind::Poi => "poi",
        }
    }

    /// Returns true for kinds precise enough to look up their enclosing
    /// administrative shapes directly.
    pub fn is_street_level(&self) -> bool {
        matches!(
            self,
            EntityKind::Street | EntityKind::Address | EntityKind::Poi
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownKind(s.to_string()))
    }
}
