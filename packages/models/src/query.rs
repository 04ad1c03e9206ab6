//! The record-query contract consumed by list filters.
//!
//! Filters never evaluate geometry themselves. They describe what they
//! want narrowed and hand it to the query, which delegates the actual
//! spatial test to the store.

use geo::Polygon;

/// "Field `field` intersects `polygon`".
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialLookup {
    /// Name of a geometry field.
    pub field: String,
    /// The polygon to test against.
    pub polygon: Polygon<f64>,
}

impl SpatialLookup {
    /// Creates an intersects lookup.
    #[must_use]
    pub fn intersects(field: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self {
            field: field.into(),
            polygon,
        }
    }
}

/// A lazily narrowed collection of records of one type.
///
/// Each call returns a new, narrower query; successive calls combine with
/// AND.
pub trait RecordQuery: Sized {
    /// Keeps records for which at least one of `lookups` holds.
    ///
    /// An empty `lookups` list matches nothing.
    #[must_use]
    fn filter_intersects_any(self, lookups: Vec<SpatialLookup>) -> Self;

    /// Keeps records whose `field` renders exactly as `value`.
    #[must_use]
    fn filter_exact(self, field: &str, value: &str) -> Self;

    /// Distinct non-null rendered values of `field`, in record order.
    fn distinct_values(&self, field: &str) -> Vec<String>;
}
