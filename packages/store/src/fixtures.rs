//! JSON fixture loading.
//!
//! A fixture file is a JSON array of entries shaped like
//!
//! ```json
//! {"model": "tests.waypoint", "pk": 1, "label": "Waypoint Test 1",
//!  "fields": {"name": "Waypoint Test 1",
//!             "waypoint": {"type": "Point", "coordinates": [50.01, 50.59]}}}
//! ```
//!
//! Geometry fields hold `GeoJSON` geometry objects.

use std::path::Path;

use geo::Geometry;
use map_admin_models::{FieldKind, FieldValue, ModelMeta, Record};
use serde::Deserialize;
use serde_json::Value;

use crate::{RecordStore, StoreError};

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    model: String,
    pk: i64,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

/// Loads fixture entries from a JSON string into `store`.
///
/// Entries are inserted in file order, which becomes record order.
///
/// # Errors
///
/// Returns [`StoreError`] if the JSON is malformed, an entry names an
/// unknown record type or field, or a value does not fit its field.
pub fn load_fixtures(store: &mut RecordStore, json: &str) -> Result<usize, StoreError> {
    let entries: Vec<FixtureEntry> = serde_json::from_str(json)?;
    let count = entries.len();

    for entry in entries {
        let meta = store
            .meta(&entry.model)
            .ok_or_else(|| StoreError::UnknownModel(entry.model.clone()))?;
        let record = to_record(meta, entry)?;
        let label = meta.label();
        store.insert(&label, record)?;
    }

    Ok(count)
}

/// Reads a fixture file and loads it into `store`.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be read or loading fails.
pub fn load_fixtures_file(store: &mut RecordStore, path: &Path) -> Result<usize, StoreError> {
    let json = std::fs::read_to_string(path)?;
    let count = load_fixtures(store, &json)?;
    log::info!("Loaded {count} fixture records from {}", path.display());
    Ok(count)
}

fn to_record(meta: &ModelMeta, entry: FixtureEntry) -> Result<Record, StoreError> {
    let label = entry
        .label
        .unwrap_or_else(|| format!("{} object ({})", meta.verbose_name(), entry.pk));
    let mut record = Record::new(entry.pk, label);

    for (name, raw) in entry.fields {
        let field = meta.field(&name).ok_or_else(|| StoreError::UnknownField {
            model: meta.label(),
            field: name.clone(),
        })?;
        let value = to_value(field.kind, raw).map_err(|message| StoreError::InvalidValue {
            model: meta.label(),
            field: name.clone(),
            message,
        })?;
        record.values.insert(name, value);
    }

    Ok(record)
}

fn to_value(kind: FieldKind, raw: Value) -> Result<FieldValue, String> {
    if raw.is_null() {
        return Ok(FieldValue::Null);
    }

    match kind {
        FieldKind::Char => raw
            .as_str()
            .map(|s| FieldValue::Text(s.to_string()))
            .ok_or_else(|| format!("expected a string, got {raw}")),
        FieldKind::Integer => raw
            .as_i64()
            .map(FieldValue::Integer)
            .ok_or_else(|| format!("expected an integer, got {raw}")),
        FieldKind::Float => raw
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| format!("expected a number, got {raw}")),
        FieldKind::Boolean => raw
            .as_bool()
            .map(FieldValue::Boolean)
            .ok_or_else(|| format!("expected a boolean, got {raw}")),
        FieldKind::Point
        | FieldKind::LineString
        | FieldKind::Polygon
        | FieldKind::MultiPolygon
        | FieldKind::GeometryCollection
        | FieldKind::Geometry => {
            let geometry = parse_geometry(raw)?;
            if kind.accepts(&geometry) {
                Ok(FieldValue::Geometry(geometry))
            } else {
                Err(format!("geometry does not fit a {kind} field"))
            }
        }
    }
}

/// Parse a `GeoJSON` geometry object into a [`Geometry`].
fn parse_geometry(raw: Value) -> Result<Geometry<f64>, String> {
    let geometry: geojson::Geometry =
        serde_json::from_value(raw).map_err(|e| format!("invalid GeoJSON geometry: {e}"))?;
    geometry
        .try_into()
        .map_err(|e: geojson::Error| format!("unsupported GeoJSON geometry: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_admin_models::FieldDef;

    fn store() -> RecordStore {
        let mut store = RecordStore::new();
        store
            .register(
                ModelMeta::new("tests", "building")
                    .with_verbose_name("Building")
                    .with_field(FieldDef::new("name", FieldKind::Char))
                    .with_field(FieldDef::new("levels", FieldKind::Integer))
                    .with_field(FieldDef::new("geometry", FieldKind::GeometryCollection)),
            )
            .unwrap();
        store
    }

    #[test]
    fn loads_entries_in_file_order() {
        let mut store = store();
        let json = r#"[
            {"model": "tests.building", "pk": 2, "label": "Town Hall",
             "fields": {"name": "Town Hall", "levels": 3, "geometry": {
                "type": "GeometryCollection", "geometries": [
                    {"type": "Point", "coordinates": [10.0, 20.0]},
                    {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
                ]}}},
            {"model": "tests.building", "pk": 1, "fields": {"levels": null}}
        ]"#;

        assert_eq!(load_fixtures(&mut store, json).unwrap(), 2);

        let pks: Vec<i64> = store.all("tests.building").unwrap().iter().map(|r| r.pk).collect();
        assert_eq!(pks, vec![2, 1]);

        let hall = store.get("tests.building", 2).unwrap().unwrap();
        assert!(matches!(
            hall.geometry("geometry"),
            Some(Geometry::GeometryCollection(c)) if c.0.len() == 2
        ));
        assert_eq!(hall.value("levels"), &FieldValue::Integer(3));

        let unnamed = store.get("tests.building", 1).unwrap().unwrap();
        assert_eq!(unnamed.label, "Building object (1)");
        assert!(unnamed.value("levels").is_null());
    }

    #[test]
    fn rejects_geometry_of_wrong_shape() {
        let mut store = store();
        let json = r#"[{"model": "tests.building", "pk": 1,
            "fields": {"geometry": {"type": "Point", "coordinates": [1, 2]}}}]"#;
        assert!(matches!(
            load_fixtures(&mut store, json),
            Err(StoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_malformed_geojson() {
        let mut store = store();
        let json = r#"[{"model": "tests.building", "pk": 1,
            "fields": {"geometry": {"type": "Blob"}}}]"#;
        assert!(matches!(
            load_fixtures(&mut store, json),
            Err(StoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_unknown_models_and_fields() {
        let mut store = store();
        let unknown_model = r#"[{"model": "tests.waypoint", "pk": 1}]"#;
        assert!(matches!(
            load_fixtures(&mut store, unknown_model),
            Err(StoreError::UnknownModel(_))
        ));

        let unknown_field = r#"[{"model": "tests.building", "pk": 1, "fields": {"height": 3}}]"#;
        assert!(matches!(
            load_fixtures(&mut store, unknown_field),
            Err(StoreError::UnknownField { .. })
        ));
    }
}
