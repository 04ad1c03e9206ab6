#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory record store standing in for the spatial database.
//!
//! Each registered record type gets a table holding its rows in insertion
//! order plus one R-tree per geometry field. Spatial lookups first narrow
//! candidates by envelope through the R-tree and then run the exact
//! `intersects` test from `geo` on the stored geometry.

pub mod fixtures;
pub mod query;
mod table;

use std::collections::BTreeMap;

use map_admin_models::{ModelMeta, Record, SchemaError};

pub use fixtures::{load_fixtures, load_fixtures_file};
pub use query::RecordSet;
use table::ModelTable;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record type is registered under this label.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// A record type with this label is already registered.
    #[error("Model already registered: {0}")]
    DuplicateModel(String),

    /// A record with this primary key already exists.
    #[error("Duplicate primary key {pk} for {model}")]
    DuplicatePk {
        /// Record type label.
        model: String,
        /// The repeated key.
        pk: i64,
    },

    /// A value was given for an undeclared field.
    #[error("{model} has no field named '{field}'")]
    UnknownField {
        /// Record type label.
        model: String,
        /// The undeclared field.
        field: String,
    },

    /// A value does not fit the declared kind of its field.
    #[error("Invalid value for {model}.{field}: {message}")]
    InvalidValue {
        /// Record type label.
        model: String,
        /// Field name.
        field: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Schema validation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A `GeoJSON` geometry could not be converted.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Reading a fixture file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// All registered record types and their rows.
#[derive(Debug, Default)]
pub struct RecordStore {
    tables: BTreeMap<String, ModelTable>,
}

impl RecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record type under `app_label.model_name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the schema is invalid or the label is
    /// already taken.
    pub fn register(&mut self, meta: ModelMeta) -> Result<(), StoreError> {
        meta.validate()?;
        let label = meta.label();
        if self.tables.contains_key(&label) {
            return Err(StoreError::DuplicateModel(label));
        }
        log::debug!("Registered model {label}");
        self.tables.insert(label, ModelTable::new(meta));
        Ok(())
    }

    /// Returns the schema of a registered record type.
    #[must_use]
    pub fn meta(&self, label: &str) -> Option<&ModelMeta> {
        self.tables.get(label).map(ModelTable::meta)
    }

    /// Labels of all registered record types, sorted.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Inserts a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the record type is unknown, the primary
    /// key is taken, or a value does not fit its field.
    pub fn insert(&mut self, label: &str, record: Record) -> Result<(), StoreError> {
        self.tables
            .get_mut(label)
            .ok_or_else(|| StoreError::UnknownModel(label.to_string()))?
            .insert(record)
    }

    /// Returns a query over every record of a type, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownModel`] if the record type is unknown.
    pub fn all(&self, label: &str) -> Result<RecordSet<'_>, StoreError> {
        self.tables
            .get(label)
            .map(RecordSet::new)
            .ok_or_else(|| StoreError::UnknownModel(label.to_string()))
    }

    /// Looks up a record by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownModel`] if the record type is unknown.
    pub fn get(&self, label: &str, pk: i64) -> Result<Option<&Record>, StoreError> {
        self.tables
            .get(label)
            .map(|table| table.get(pk))
            .ok_or_else(|| StoreError::UnknownModel(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;
    use map_admin_models::{FieldDef, FieldKind, FieldValue};

    fn waypoint_meta() -> ModelMeta {
        ModelMeta::new("tests", "waypoint")
            .with_field(FieldDef::new("name", FieldKind::Char))
            .with_field(FieldDef::new("waypoint", FieldKind::Point))
    }

    #[test]
    fn rejects_duplicate_registration() {
        let mut store = RecordStore::new();
        store.register(waypoint_meta()).unwrap();
        assert!(matches!(
            store.register(waypoint_meta()),
            Err(StoreError::DuplicateModel(label)) if label == "tests.waypoint"
        ));
    }

    #[test]
    fn rejects_records_for_unknown_models() {
        let mut store = RecordStore::new();
        let err = store.insert("tests.waypoint", Record::new(1, "a")).unwrap_err();
        assert!(matches!(err, StoreError::UnknownModel(_)));
    }

    #[test]
    fn looks_up_by_primary_key() {
        let mut store = RecordStore::new();
        store.register(waypoint_meta()).unwrap();
        store
            .insert(
                "tests.waypoint",
                Record::new(4, "Waypoint Test 4")
                    .with_value("name", FieldValue::Text("Waypoint Test 4".into()))
                    .with_geometry("waypoint", Point::new(50.04, 50.56)),
            )
            .unwrap();

        let record = store.get("tests.waypoint", 4).unwrap().unwrap();
        assert_eq!(record.label, "Waypoint Test 4");
        assert!(store.get("tests.waypoint", 5).unwrap().is_none());
        assert!(store.get("tests.nothing", 4).is_err());
    }
}
