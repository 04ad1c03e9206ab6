//! Narrowable views over a table's rows.

use std::collections::BTreeSet;

use map_admin_models::{ModelMeta, Record, RecordQuery, SpatialLookup};

use crate::table::ModelTable;

/// The rows of one record type that survived every filter so far, in
/// insertion order.
#[derive(Debug, Clone)]
pub struct RecordSet<'a> {
    table: &'a ModelTable,
    rows: Vec<usize>,
}

impl<'a> RecordSet<'a> {
    pub(crate) fn new(table: &'a ModelTable) -> Self {
        Self {
            table,
            rows: (0..table.len()).collect(),
        }
    }

    /// Schema of the underlying record type.
    #[must_use]
    pub const fn meta(&self) -> &'a ModelMeta {
        self.table.meta()
    }

    /// Number of matching records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates over the matching records.
    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.rows.iter().map(|&row| self.table.record(row))
    }

    /// Clones up to `limit` matching records starting at `offset`.
    #[must_use]
    pub fn slice(&self, offset: usize, limit: usize) -> Vec<Record> {
        self.iter().skip(offset).take(limit).cloned().collect()
    }
}

impl RecordQuery for RecordSet<'_> {
    fn filter_intersects_any(mut self, lookups: Vec<SpatialLookup>) -> Self {
        let matched: BTreeSet<usize> = lookups
            .iter()
            .flat_map(|lookup| self.table.intersecting_rows(lookup))
            .collect();
        self.rows.retain(|row| matched.contains(row));
        self
    }

    fn filter_exact(mut self, field: &str, value: &str) -> Self {
        let table = self.table;
        self.rows
            .retain(|&row| table.record(row).value(field).to_string() == value);
        self
    }

    fn distinct_values(&self, field: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.iter()
            .map(|record| record.value(field))
            .filter(|value| !value.is_null())
            .map(ToString::to_string)
            .filter(|value| seen.insert(value.clone()))
            .collect()
    }
}
