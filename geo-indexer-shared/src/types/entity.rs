//! Geographic entity model.
//!
//! A [`GeoEntity`] is the in-memory form of one document in the geo index. It
//! is built from a loosely typed parameter mapping (a stored `_source`, an
//! import row, a containment hit) through a static table of recognized field
//! names, and projected back into a sparse document body for writing.

use serde_json::{Map, Value};

use crate::errors::ModelError;
use crate::types::geometry::{CenterPoint, Geometry};
use crate::types::kind::EntityKind;
use crate::types::projection::Projection;
use crate::types::suggestion::Suggestion;

/// Loosely typed field mapping used to construct and update entities.
pub type Params = Map<String, Value>;

/// Attributes copied from an enclosing shape of one containment kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Containment {
    pub id: Option<String>,
    pub name: Option<String>,
    pub alternate_names: Vec<String>,
    pub population: Option<i64>,
}

/// One geographic entity.
///
/// The kind is fixed at construction. The identity is assigned by the index
/// store on first write and kept afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoEntity {
    kind: EntityKind,
    id: Option<String>,
    pub center_point: Option<CenterPoint>,
    pub center_shape: Option<Geometry>,
    pub boundaries: Option<Geometry>,
    pub name: Option<String>,
    pub alternate_names: Vec<String>,
    pub population: Option<i64>,
    /// GeoNames feature class (`P` for populated places).
    pub feature_class: Option<String>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub admin1_code: Option<String>,
    pub admin1_name: Option<String>,
    pub admin2_code: Option<String>,
    pub admin2_name: Option<String>,
    pub local_admin: Containment,
    pub locality: Containment,
    pub neighborhood: Containment,
}

type FieldSetter = fn(&mut GeoEntity, &Value) -> Result<(), ModelError>;

/// Recognized input fields. Keys not listed here are ignored.
static FIELDS: &[(&str, FieldSetter)] = &[
    ("id", |e: &mut GeoEntity, v: &Value| {
        e.id = string_value("id", v)?;
        Ok(())
    }),
    ("center_point", |e: &mut GeoEntity, v: &Value| {
        e.center_point = point_value("center_point", v)?;
        Ok(())
    }),
    ("center_shape", |e: &mut GeoEntity, v: &Value| {
        e.center_shape = geometry_value("center_shape", v)?;
        Ok(())
    }),
    ("boundaries", |e: &mut GeoEntity, v: &Value| {
        e.boundaries = geometry_value("boundaries", v)?;
        Ok(())
    }),
    ("name", |e: &mut GeoEntity, v: &Value| {
        e.name = string_value("name", v)?;
        Ok(())
    }),
    ("alternate_names", |e: &mut GeoEntity, v: &Value| {
        e.alternate_names = strings_value("alternate_names", v)?;
        Ok(())
    }),
    ("population", |e: &mut GeoEntity, v: &Value| {
        e.population = integer_value("population", v)?;
        Ok(())
    }),
    ("feature_class", |e: &mut GeoEntity, v: &Value| {
        e.feature_class = string_value("feature_class", v)?;
        Ok(())
    }),
    ("country_code", |e: &mut GeoEntity, v: &Value| {
        e.country_code = string_value("country_code", v)?;
        Ok(())
    }),
    ("country_name", |e: &mut GeoEntity, v: &Value| {
        e.country_name = string_value("country_name", v)?;
        Ok(())
    }),
    ("admin1_code", |e: &mut GeoEntity, v: &Value| {
        e.admin1_code = string_value("admin1_code", v)?;
        Ok(())
    }),
    ("admin1_name", |e: &mut GeoEntity, v: &Value| {
        e.admin1_name = string_value("admin1_name", v)?;
        Ok(())
    }),
    ("admin2_code", |e: &mut GeoEntity, v: &Value| {
        e.admin2_code = string_value("admin2_code", v)?;
        Ok(())
    }),
    ("admin2_name", |e: &mut GeoEntity, v: &Value| {
        e.admin2_name = string_value("admin2_name", v)?;
        Ok(())
    }),
    ("local_admin_id", |e: &mut GeoEntity, v: &Value| {
        e.local_admin.id = string_value("local_admin_id", v)?;
        Ok(())
    }),
    ("local_admin_name", |e: &mut GeoEntity, v: &Value| {
        e.local_admin.name = string_value("local_admin_name", v)?;
        Ok(())
    }),
    ("local_admin_alternate_names", |e: &mut GeoEntity, v: &Value| {
        e.local_admin.alternate_names = strings_value("local_admin_alternate_names", v)?;
        Ok(())
    }),
    ("local_admin_population", |e: &mut GeoEntity, v: &Value| {
        e.local_admin.population = integer_value("local_admin_population", v)?;
        Ok(())
    }),
    ("locality_id", |e: &mut GeoEntity, v: &Value| {
        e.locality.id = string_value("locality_id", v)?;
        Ok(())
    }),
    ("locality_name", |e: &mut GeoEntity, v: &Value| {
        e.locality.name = string_value("locality_name", v)?;
        Ok(())
    }),
    ("locality_alternate_names", |e: &mut GeoEntity, v: &Value| {
        e.locality.alternate_names = strings_value("locality_alternate_names", v)?;
        Ok(())
    }),
    ("locality_population", |e: &mut GeoEntity, v: &Value| {
        e.locality.population = integer_value("locality_population", v)?;
        Ok(())
    }),
    ("neighborhood_id", |e: &mut GeoEntity, v: &Value| {
        e.neighborhood.id = string_value("neighborhood_id", v)?;
        Ok(())
    }),
    ("neighborhood_name", |e: &mut GeoEntity, v: &Value| {
        e.neighborhood.name = string_value("neighborhood_name", v)?;
        Ok(())
    }),
    ("neighborhood_alternate_names", |e: &mut GeoEntity, v: &Value| {
        e.neighborhood.alternate_names = strings_value("neighborhood_alternate_names", v)?;
        Ok(())
    }),
    ("neighborhood_population", |e: &mut GeoEntity, v: &Value| {
        e.neighborhood.population = integer_value("neighborhood_population", v)?;
        Ok(())
    }),
];

fn setter_for(field: &str) -> Option<FieldSetter> {
    FIELDS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, setter)| *setter)
}

impl GeoEntity {
    /// Create an empty entity of the given kind.
    pub fn empty(kind: EntityKind) -> Self {
        Self {
            kind,
            id: None,
            center_point: None,
            center_shape: None,
            boundaries: None,
            name: None,
            alternate_names: Vec::new(),
            population: None,
            feature_class: None,
            country_code: None,
            country_name: None,
            admin1_code: None,
            admin1_name: None,
            admin2_code: None,
            admin2_name: None,
            local_admin: Containment::default(),
            locality: Containment::default(),
            neighborhood: Containment::default(),
        }
    }

    /// Construct an entity from a parameter mapping.
    ///
    /// Unrecognized keys are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use geo_indexer_shared::{EntityKind, GeoEntity};
    /// use serde_json::json;
    ///
    /// let params = json!({ "name": "Example City", "country_code": "US", "colour": "red" });
    /// let entity = GeoEntity::new(EntityKind::Locality, params.as_object().unwrap()).unwrap();
    /// assert_eq!(entity.name.as_deref(), Some("Example City"));
    /// ```
    pub fn new(kind: EntityKind, params: &Params) -> Result<Self, ModelError> {
        let mut entity = Self::empty(kind);
        entity.merge(params)?;
        Ok(entity)
    }

    /// Create an entity that only carries its store identity.
    pub fn with_id(kind: EntityKind, id: impl Into<String>) -> Self {
        let mut entity = Self::empty(kind);
        entity.id = Some(id.into());
        entity
    }

    /// Merge recognized fields from `params` into this entity.
    ///
    /// A `null` value clears the field. Unrecognized keys are ignored. When
    /// any value is rejected the entity is left as it was.
    pub fn merge(&mut self, params: &Params) -> Result<(), ModelError> {
        let mut merged = self.clone();
        for (key, value) in params {
            if let Some(setter) = setter_for(key) {
                setter(&mut merged, value)?;
            }
        }
        *self = merged;
        Ok(())
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn is_street_level(&self) -> bool {
        self.kind.is_street_level()
    }

    pub fn lat(&self) -> Option<f64> {
        self.center_point.map(|p| p.lat)
    }

    pub fn lon(&self) -> Option<f64> {
        self.center_point.map(|p| p.lon)
    }

    /// State abbreviation, only meaningful for US entities.
    pub fn admin1_abbr(&self) -> Option<&str> {
        match self.country_code.as_deref() {
            Some("US") => self.admin1_code.as_deref(),
            _ => None,
        }
    }

    /// The shape used to look up enclosing administrative boundaries.
    ///
    /// Falls back to a point geometry built from `center_point`.
    pub fn shape_for_containment(&self) -> Option<Geometry> {
        match &self.center_shape {
            Some(shape) if !shape.is_empty() => Some(shape.clone()),
            _ => self.center_point.map(|p| p.to_geometry()),
        }
    }

    /// Containment attributes for one of the containment kinds.
    pub fn containment(&self, kind: EntityKind) -> Option<&Containment> {
        match kind {
            EntityKind::LocalAdmin => Some(&self.local_admin),
            EntityKind::Locality => Some(&self.locality),
            EntityKind::Neighborhood => Some(&self.neighborhood),
            _ => None,
        }
    }

    /// Autocomplete payload for this entity, if its kind produces one.
    pub fn generate_suggestion(&self) -> Option<Suggestion> {
        Suggestion::for_entity(self)
    }

    /// Project the entity into a sparse document body.
    ///
    /// Empty strings, absent values and empty lists are left out so that a
    /// partial update never erases a previously stored value. The identity
    /// is returned alongside the body, not inside it.
    pub fn project(&self) -> Projection {
        let mut body = Map::new();

        if let Some(point) = self.center_point {
            body.insert("center_point".to_string(), Value::from(vec![point.lon, point.lat]));
        }
        put_geometry(&mut body, "center_shape", &self.center_shape);
        put_geometry(&mut body, "boundaries", &self.boundaries);
        put_str(&mut body, "name", &self.name);
        put_list(&mut body, "alternate_names", &self.alternate_names);
        put_int(&mut body, "population", self.population);
        put_str(&mut body, "feature_class", &self.feature_class);
        put_str(&mut body, "country_code", &self.country_code);
        put_str(&mut body, "country_name", &self.country_name);
        put_str(&mut body, "admin1_code", &self.admin1_code);
        put_str(&mut body, "admin1_name", &self.admin1_name);
        put_str(&mut body, "admin2_code", &self.admin2_code);
        put_str(&mut body, "admin2_name", &self.admin2_name);

        for kind in EntityKind::CONTAINMENT_ORDER {
            if let Some(containment) = self.containment(kind) {
                let prefix = kind.as_str();
                put_str(&mut body, &format!("{prefix}_id"), &containment.id);
                put_str(&mut body, &format!("{prefix}_name"), &containment.name);
                put_list(
                    &mut body,
                    &format!("{prefix}_alternate_names"),
                    &containment.alternate_names,
                );
                put_int(&mut body, &format!("{prefix}_population"), containment.population);
            }
        }

        Projection::new(self.id.clone(), body)
    }
}

fn put_str(body: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
        body.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn put_list(body: &mut Map<String, Value>, key: &str, values: &[String]) {
    if !values.is_empty() {
        body.insert(key.to_string(), Value::from(values.to_vec()));
    }
}

fn put_int(body: &mut Map<String, Value>, key: &str, value: Option<i64>) {
    if let Some(value) = value {
        body.insert(key.to_string(), Value::from(value));
    }
}

fn put_geometry(body: &mut Map<String, Value>, key: &str, value: &Option<Geometry>) {
    if let Some(geometry) = value.as_ref().filter(|g| !g.is_empty()) {
        body.insert(key.to_string(), geometry.as_value().clone());
    }
}

fn string_value(field: &str, value: &Value) -> Result<Option<String>, ModelError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(ModelError::invalid_field(field, "string")),
    }
}

fn strings_value(field: &str, value: &Value) -> Result<Vec<String>, ModelError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(ModelError::invalid_field(field, "list of strings")),
            })
            .collect(),
        _ => Err(ModelError::invalid_field(field, "list of strings")),
    }
}

fn integer_value(field: &str, value: &Value) -> Result<Option<i64>, ModelError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(Some)
            .ok_or_else(|| ModelError::invalid_field(field, "integer")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ModelError::invalid_field(field, "integer")),
        _ => Err(ModelError::invalid_field(field, "integer")),
    }
}

fn point_value(field: &str, value: &Value) -> Result<Option<CenterPoint>, ModelError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) if items.len() == 2 => match (items[0].as_f64(), items[1].as_f64()) {
            (Some(lon), Some(lat)) => Ok(Some(CenterPoint::new(lon, lat))),
            _ => Err(ModelError::invalid_field(field, "[lon, lat] pair")),
        },
        Value::Object(map) => match (
            map.get("lon").and_then(Value::as_f64),
            map.get("lat").and_then(Value::as_f64),
        ) {
            (Some(lon), Some(lat)) => Ok(Some(CenterPoint::new(lon, lat))),
            _ => Err(ModelError::invalid_field(field, "[lon, lat] pair")),
        },
        _ => Err(ModelError::invalid_field(field, "[lon, lat] pair")),
    }
}

fn geometry_value(field: &str, value: &Value) -> Result<Option<Geometry>, ModelError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(_) | Value::String(_) => Ok(Some(Geometry(value.clone()))),
        _ => Err(ModelError::invalid_field(field, "GeoJSON geometry")),
    }
}
