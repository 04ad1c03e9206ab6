//! Rows of one record type and their per-field spatial indexes.

use std::collections::{BTreeMap, BTreeSet};

use geo::{BoundingRect as _, Geometry, Intersects as _};
use map_admin_models::{FieldKind, FieldValue, ModelMeta, Record, SpatialLookup};
use rstar::{AABB, RTree, RTreeObject};

use crate::StoreError;

/// Envelope of one stored geometry, pointing back at its row.
#[derive(Debug)]
struct GeometryEntry {
    row: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for GeometryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

#[derive(Debug)]
pub struct ModelTable {
    meta: ModelMeta,
    records: Vec<Record>,
    rows_by_pk: BTreeMap<i64, usize>,
    indexes: BTreeMap<String, RTree<GeometryEntry>>,
}

impl ModelTable {
    pub fn new(meta: ModelMeta) -> Self {
        let indexes = meta
            .fields
            .iter()
            .filter(|f| f.kind.is_geometry())
            .map(|f| (f.name.clone(), RTree::new()))
            .collect();

        Self {
            meta,
            records: Vec::new(),
            rows_by_pk: BTreeMap::new(),
            indexes,
        }
    }

    pub const fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn record(&self, row: usize) -> &Record {
        &self.records[row]
    }

    pub fn get(&self, pk: i64) -> Option<&Record> {
        self.rows_by_pk.get(&pk).map(|&row| &self.records[row])
    }

    pub fn insert(&mut self, record: Record) -> Result<(), StoreError> {
        if self.rows_by_pk.contains_key(&record.pk) {
            return Err(StoreError::DuplicatePk {
                model: self.meta.label(),
                pk: record.pk,
            });
        }

        for (name, value) in &record.values {
            self.check_value(name, value)?;
        }

        let row = self.records.len();
        for (name, index) in &mut self.indexes {
            if let Some(envelope) = record.geometry(name).and_then(envelope_of) {
                index.insert(GeometryEntry { row, envelope });
            }
        }

        self.rows_by_pk.insert(record.pk, row);
        self.records.push(record);
        Ok(())
    }

    /// Rows where `lookup.field` intersects `lookup.polygon`.
    ///
    /// Unknown or non-geometry fields match nothing.
    pub fn intersecting_rows(&self, lookup: &SpatialLookup) -> BTreeSet<usize> {
        let Some(index) = self.indexes.get(&lookup.field) else {
            log::warn!(
                "Spatial lookup on {}.{} which is not an indexed geometry field",
                self.meta.label(),
                lookup.field
            );
            return BTreeSet::new();
        };

        let polygon = Geometry::Polygon(lookup.polygon.clone());
        let Some(query_env) = envelope_of(&polygon) else {
            return BTreeSet::new();
        };

        index
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| {
                self.records[entry.row]
                    .geometry(&lookup.field)
                    .is_some_and(|g| g.intersects(&lookup.polygon))
            })
            .map(|entry| entry.row)
            .collect()
    }

    fn check_value(&self, name: &str, value: &FieldValue) -> Result<(), StoreError> {
        let field = self
            .meta
            .field(name)
            .ok_or_else(|| StoreError::UnknownField {
                model: self.meta.label(),
                field: name.to_string(),
            })?;

        let fits = match (field.kind, value) {
            (_, FieldValue::Null)
            | (FieldKind::Char, FieldValue::Text(_))
            | (FieldKind::Integer, FieldValue::Integer(_))
            | (FieldKind::Float, FieldValue::Float(_) | FieldValue::Integer(_))
            | (FieldKind::Boolean, FieldValue::Boolean(_)) => true,
            (kind, FieldValue::Geometry(g)) => kind.accepts(g),
            _ => false,
        };

        if fits {
            Ok(())
        } else {
            Err(StoreError::InvalidValue {
                model: self.meta.label(),
                field: name.to_string(),
                message: format!("{value:?} does not fit a {} field", field.kind),
            })
        }
    }
}

/// Compute the bounding box envelope for a geometry. Empty geometries
/// have none.
fn envelope_of(geometry: &Geometry<f64>) -> Option<AABB<[f64; 2]>> {
    geometry
        .bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Point, polygon};
    use map_admin_models::{BoundingBox, FieldDef};

    fn table() -> ModelTable {
        ModelTable::new(
            ModelMeta::new("tests", "deliveryjob")
                .with_field(FieldDef::new("name", FieldKind::Char))
                .with_field(FieldDef::new("weight", FieldKind::Float))
                .with_field(FieldDef::new("pickup_point", FieldKind::Point))
                .with_field(FieldDef::new("route", FieldKind::LineString)),
        )
    }

    #[test]
    fn indexes_only_present_geometries() {
        let mut t = table();
        t.insert(Record::new(1, "a").with_geometry("pickup_point", Point::new(1.0, 1.0)))
            .unwrap();
        t.insert(Record::new(2, "b")).unwrap();

        assert_eq!(t.len(), 2);
        assert_eq!(t.indexes["pickup_point"].size(), 1);
        assert_eq!(t.indexes["route"].size(), 0);
    }

    #[test]
    fn rejects_mismatched_values() {
        let mut t = table();
        let err = t
            .insert(Record::new(1, "a").with_geometry("route", Point::new(1.0, 1.0)))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));

        let err = t
            .insert(Record::new(2, "b").with_value("pickup_point", FieldValue::Integer(3)))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));

        let err = t
            .insert(Record::new(3, "c").with_value("colour", FieldValue::Text("red".into())))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownField { .. }));

        assert!(t
            .insert(Record::new(4, "d").with_value("weight", FieldValue::Integer(3)))
            .is_ok());
    }

    #[test]
    fn rejects_duplicate_primary_keys() {
        let mut t = table();
        t.insert(Record::new(1, "a")).unwrap();
        assert!(matches!(
            t.insert(Record::new(1, "b")),
            Err(StoreError::DuplicatePk { pk: 1, .. })
        ));
    }

    #[test]
    fn exact_test_runs_after_envelope_match() {
        let mut t = table();
        // Diagonal line whose envelope covers the box but which passes
        // far from it.
        t.insert(
            Record::new(1, "diagonal")
                .with_geometry("route", LineString::from(vec![(0.0, 0.0), (10.0, 10.0)])),
        )
        .unwrap();
        t.insert(
            Record::new(2, "crossing")
                .with_geometry("route", LineString::from(vec![(8.0, 0.0), (8.0, 3.0)])),
        )
        .unwrap();

        let corner = BoundingBox::new(7.0, 1.0, 9.0, 2.0).to_polygon();
        let rows = t.intersecting_rows(&SpatialLookup::intersects("route", corner));
        assert_eq!(rows.into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn boundary_contact_counts_as_intersection() {
        let mut t = table();
        t.insert(Record::new(1, "edge").with_geometry("pickup_point", Point::new(2.0, 1.5)))
            .unwrap();
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
        ];
        let rows = t.intersecting_rows(&SpatialLookup::intersects("pickup_point", square));
        assert!(rows.contains(&0));
    }

    #[test]
    fn lookups_on_non_geometry_fields_match_nothing() {
        let mut t = table();
        t.insert(Record::new(1, "a").with_value("name", FieldValue::Text("a".into())))
            .unwrap();
        let polygon = BoundingBox::new(-180.0, -90.0, 180.0, 90.0).to_polygon();
        assert!(t
            .intersecting_rows(&SpatialLookup::intersects("name", polygon))
            .is_empty());
    }
}
