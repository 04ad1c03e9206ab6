#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record and schema types shared by the map admin crates.
//!
//! A record type is described by a [`ModelMeta`] (its owning app, its name
//! and its ordered field list). Records themselves are opaque rows keyed by
//! primary key whose geometry attributes hold [`geo::Geometry`] values.
//! Everything here is read-only from the point of view of the admin: the
//! store owns the rows.

pub mod bbox;
pub mod i18n;
pub mod query;

use std::collections::BTreeMap;
use std::fmt;

use geo::Geometry;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use bbox::BoundingBox;
pub use i18n::Catalog;
pub use query::{RecordQuery, SpatialLookup};

/// Errors raised while validating a record type's schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A configured field name does not exist on the record type.
    #[error("{model} has no field named '{field}'")]
    UnknownField {
        /// `app_label.model_name` of the record type.
        model: String,
        /// The offending field name.
        field: String,
    },

    /// A configured geometry field is declared with a non-geometry kind.
    #[error("{model}.{field} is a {kind} field, not a geometry field")]
    NotGeometry {
        /// `app_label.model_name` of the record type.
        model: String,
        /// The offending field name.
        field: String,
        /// The declared kind.
        kind: FieldKind,
    },

    /// Two fields share the same name.
    #[error("{model} declares field '{field}' more than once")]
    DuplicateField {
        /// `app_label.model_name` of the record type.
        model: String,
        /// The duplicated field name.
        field: String,
    },
}

/// Declared kind of a record attribute.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldKind {
    /// Free text.
    Char,
    /// Signed integer.
    Integer,
    /// Floating point number.
    Float,
    /// True/false flag.
    Boolean,
    /// A single position.
    Point,
    /// An open or closed line.
    LineString,
    /// A polygon with optional holes.
    Polygon,
    /// A set of polygons.
    MultiPolygon,
    /// A heterogeneous set of the supported shapes.
    GeometryCollection,
    /// Any of the supported shapes.
    Geometry,
}

impl FieldKind {
    /// Whether attributes of this kind hold geometry values.
    #[must_use]
    pub const fn is_geometry(self) -> bool {
        matches!(
            self,
            Self::Point
                | Self::LineString
                | Self::Polygon
                | Self::MultiPolygon
                | Self::GeometryCollection
                | Self::Geometry
        )
    }

    /// Whether `geometry` may be stored in an attribute of this kind.
    ///
    /// Only points, line strings, polygons, multi-polygons and collections
    /// composed of those are supported.
    #[must_use]
    pub fn accepts(self, geometry: &Geometry<f64>) -> bool {
        match self {
            Self::Point => matches!(geometry, Geometry::Point(_)),
            Self::LineString => matches!(geometry, Geometry::LineString(_)),
            Self::Polygon => matches!(geometry, Geometry::Polygon(_)),
            Self::MultiPolygon => matches!(geometry, Geometry::MultiPolygon(_)),
            Self::GeometryCollection => match geometry {
                Geometry::GeometryCollection(collection) => {
                    collection.0.iter().all(is_supported_geometry)
                }
                _ => false,
            },
            Self::Geometry => is_supported_geometry(geometry),
            Self::Char | Self::Integer | Self::Float | Self::Boolean => false,
        }
    }
}

fn is_supported_geometry(geometry: &Geometry<f64>) -> bool {
    match geometry {
        Geometry::Point(_)
        | Geometry::LineString(_)
        | Geometry::Polygon(_)
        | Geometry::MultiPolygon(_) => true,
        Geometry::GeometryCollection(collection) => collection.0.iter().all(is_supported_geometry),
        _ => false,
    }
}

/// Returns the `GeoJSON` type name of a geometry.
#[must_use]
pub const fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) | Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
    }
}

/// A declared attribute of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Attribute name.
    pub name: String,
    /// Human-readable name. Derived from `name` when absent.
    #[serde(default)]
    pub verbose_name: Option<String>,
    /// Declared kind.
    pub kind: FieldKind,
}

impl FieldDef {
    /// Creates a field with a derived verbose name.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            verbose_name: None,
            kind,
        }
    }

    /// Sets an explicit verbose name.
    #[must_use]
    pub fn with_verbose_name(mut self, verbose_name: impl Into<String>) -> Self {
        self.verbose_name = Some(verbose_name.into());
        self
    }

    /// Returns the verbose name, falling back to the attribute name with
    /// underscores replaced by spaces.
    #[must_use]
    pub fn verbose_name(&self) -> String {
        self.verbose_name
            .clone()
            .unwrap_or_else(|| self.name.replace('_', " "))
    }
}

/// Schema of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMeta {
    /// Identifier of the owning module (e.g. `"tests"`).
    pub app_label: String,
    /// Lower-case type identifier (e.g. `"waypoint"`).
    pub model_name: String,
    /// Human-readable singular name.
    #[serde(default)]
    pub verbose_name: Option<String>,
    /// Human-readable plural name.
    #[serde(default)]
    pub verbose_name_plural: Option<String>,
    /// Declared attributes, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl ModelMeta {
    /// Creates a record type without fields.
    #[must_use]
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            model_name: model_name.into(),
            verbose_name: None,
            verbose_name_plural: None,
            fields: Vec::new(),
        }
    }

    /// Sets the singular verbose name.
    #[must_use]
    pub fn with_verbose_name(mut self, verbose_name: impl Into<String>) -> Self {
        self.verbose_name = Some(verbose_name.into());
        self
    }

    /// Appends a field declaration.
    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// `app_label.model_name`, the key records and admins are registered
    /// under.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Singular display name.
    #[must_use]
    pub fn verbose_name(&self) -> String {
        self.verbose_name
            .clone()
            .unwrap_or_else(|| self.model_name.clone())
    }

    /// Plural display name.
    #[must_use]
    pub fn verbose_name_plural(&self) -> String {
        self.verbose_name_plural
            .clone()
            .unwrap_or_else(|| format!("{}s", self.verbose_name()))
    }

    /// Looks up a declared field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks that field names are unique.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateField`] on the first repeated name.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = std::collections::BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    model: self.label(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Value of a single record attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// No value.
    Null,
    /// Text value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// Geometry value.
    Geometry(Geometry<f64>),
}

impl FieldValue {
    /// Whether the value is [`FieldValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the geometry if this is a geometry value.
    #[must_use]
    pub const fn as_geometry(&self) -> Option<&Geometry<f64>> {
        match self {
            Self::Geometry(g) => Some(g),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("-"),
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Geometry(g) => f.write_str(geometry_type_name(g)),
        }
    }
}

/// A single row of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Primary key.
    pub pk: i64,
    /// Human-readable representation of the record.
    pub label: String,
    /// Attribute values by field name. Missing entries read as null.
    pub values: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates a record without attribute values.
    #[must_use]
    pub fn new(pk: i64, label: impl Into<String>) -> Self {
        Self {
            pk,
            label: label.into(),
            values: BTreeMap::new(),
        }
    }

    /// Sets an attribute value.
    #[must_use]
    pub fn with_value(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    /// Sets a geometry attribute.
    #[must_use]
    pub fn with_geometry(
        self,
        field: impl Into<String>,
        geometry: impl Into<Geometry<f64>>,
    ) -> Self {
        self.with_value(field, FieldValue::Geometry(geometry.into()))
    }

    /// Returns the value of `field`, or [`FieldValue::Null`] if unset.
    #[must_use]
    pub fn value(&self, field: &str) -> &FieldValue {
        const NULL: &FieldValue = &FieldValue::Null;
        self.values.get(field).unwrap_or(NULL)
    }

    /// Returns the geometry stored in `field`, if any.
    #[must_use]
    pub fn geometry(&self, field: &str) -> Option<&Geometry<f64>> {
        self.value(field).as_geometry()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Ordered names of the attributes of a record type that hold geometry.
///
/// Built once per record type when it is registered and never mutated
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryFieldSet(Vec<String>);

impl GeometryFieldSet {
    /// Collects every geometry-typed field of `meta`, in declaration order.
    #[must_use]
    pub fn discover(meta: &ModelMeta) -> Self {
        Self(
            meta.fields
                .iter()
                .filter(|f| f.kind.is_geometry())
                .map(|f| f.name.clone())
                .collect(),
        )
    }

    /// Validates an explicit field list against the schema.
    ///
    /// An empty list falls back to [`Self::discover`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if a name is unknown or does not refer to a
    /// geometry field.
    pub fn configured(meta: &ModelMeta, names: &[String]) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Ok(Self::discover(meta));
        }

        for name in names {
            let field = meta.field(name).ok_or_else(|| SchemaError::UnknownField {
                model: meta.label(),
                field: name.clone(),
            })?;
            if !field.kind.is_geometry() {
                return Err(SchemaError::NotGeometry {
                    model: meta.label(),
                    field: name.clone(),
                    kind: field.kind,
                });
            }
        }

        Ok(Self(names.to_vec()))
    }

    /// Iterates over the field names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The field names as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// The incoming request as seen by filters and feature hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Request path.
    pub path: String,
    /// Decoded query parameters.
    pub params: BTreeMap<String, String>,
}

impl RequestContext {
    /// Creates a context for `path` with the given query parameters.
    #[must_use]
    pub fn new(path: impl Into<String>, params: BTreeMap<String, String>) -> Self {
        Self {
            path: path.into(),
            params,
        }
    }

    /// Returns the value of a query parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
