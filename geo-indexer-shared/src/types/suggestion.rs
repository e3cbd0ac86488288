//! Autocomplete suggestion payloads.
//!
//! The payload is written to the `suggest` field, mapped as an OpenSearch
//! `completion` field. Each entity kind decides how its inputs are built;
//! GeoNames points produce no suggestion at all.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::entity::GeoEntity;
use crate::types::kind::EntityKind;

/// Largest weight accepted by a completion field.
pub const MAX_WEIGHT: u32 = i32::MAX as u32;

/// A completion-field payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub input: Vec<String>,
    pub weight: u32,
}

impl Suggestion {
    /// Create a suggestion, dropping blank and repeated inputs.
    pub fn new(input: Vec<String>, weight: u32) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(input.len());
        for candidate in input {
            let candidate = candidate.trim().to_string();
            if !candidate.is_empty() && !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        Self {
            input: unique,
            weight: weight.min(MAX_WEIGHT),
        }
    }

    /// Build the suggestion for an entity according to its kind.
    pub fn for_entity(entity: &GeoEntity) -> Option<Self> {
        let suggestion = match entity.kind() {
            EntityKind::Geoname => None,
            EntityKind::Admin1
            | EntityKind::Admin2
            | EntityKind::LocalAdmin
            | EntityKind::Locality
            | EntityKind::Neighborhood => administrative(entity),
            EntityKind::Street | EntityKind::Address | EntityKind::Poi => street_level(entity),
        }?;

        (!suggestion.input.is_empty()).then_some(suggestion)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "input": self.input,
            "weight": self.weight,
        })
    }
}

fn administrative(entity: &GeoEntity) -> Option<Suggestion> {
    let name = entity.name.as_deref()?;
    let mut input = vec![name.to_string()];
    input.extend(entity.alternate_names.iter().cloned());

    let qualifier = entity.admin1_abbr().or(entity.admin1_name.as_deref());
    if let Some(qualifier) = qualifier.filter(|q| !q.is_empty() && *q != name) {
        input.push(format!("{name}, {qualifier}"));
    }

    Some(Suggestion::new(input, weight(entity.population)))
}

fn street_level(entity: &GeoEntity) -> Option<Suggestion> {
    let name = entity.name.as_deref()?;
    let mut input = vec![name.to_string()];

    for area in [&entity.neighborhood.name, &entity.locality.name] {
        if let Some(area) = area.as_deref().filter(|a| !a.is_empty()) {
            input.push(format!("{name}, {area}"));
        }
    }

    Some(Suggestion::new(input, weight(entity.locality.population)))
}

fn weight(population: Option<i64>) -> u32 {
    population
        .map(|p| p.clamp(0, i64::from(MAX_WEIGHT)) as u32)
        .unwrap_or(0)
}
