//! Spatial list filter driven by a map-drawn rectangle.

use map_admin_models::{BoundingBox, Catalog, GeometryFieldSet, RecordQuery, SpatialLookup};

use crate::FilterChoice;

/// Narrows a change list to records with at least one geometry field
/// intersecting the `bounding_box` query parameter.
///
/// The parameter is `minX,minY,maxX,maxY`. A missing or malformed value
/// leaves the query untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundingBoxFilter {
    fields: Option<GeometryFieldSet>,
}

impl BoundingBoxFilter {
    /// Query parameter read by the filter.
    pub const PARAMETER_NAME: &'static str = "bounding_box";

    /// Untranslated filter title.
    pub const TITLE: &'static str = "Bounding Box";

    /// Untranslated label of the single choice.
    pub const CHOICE_LABEL: &'static str = "Current map bounding box";

    /// Creates a filter over the record type's geometry field set.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: None }
    }

    /// Restricts the filter to `fields` instead of the record type's
    /// geometry field set.
    #[must_use]
    pub fn with_fields(mut self, fields: GeometryFieldSet) -> Self {
        self.fields = Some(fields);
        self
    }

    /// The field set the filter tests, given the record type's default.
    #[must_use]
    pub fn fields<'a>(&'a self, default: &'a GeometryFieldSet) -> &'a GeometryFieldSet {
        self.fields.as_ref().unwrap_or(default)
    }

    /// Applies the filter.
    ///
    /// Returns the narrowed query and the current selection to echo back
    /// to the page. When `raw` does not parse, the query is returned
    /// unchanged and the selection is empty.
    pub fn apply<Q: RecordQuery>(
        &self,
        query: Q,
        raw: Option<&str>,
        fields: &GeometryFieldSet,
    ) -> (Q, String) {
        let Some((raw, bbox)) = raw.and_then(|s| BoundingBox::parse(s).map(|b| (s, b))) else {
            if let Some(raw) = raw {
                log::debug!("Ignoring malformed {}={raw:?}", Self::PARAMETER_NAME);
            }
            return (query, String::new());
        };

        let polygon = bbox.to_polygon();
        let lookups = self
            .fields(fields)
            .iter()
            .map(|field| SpatialLookup::intersects(field, polygon.clone()))
            .collect();

        (query.filter_intersects_any(lookups), raw.to_string())
    }

    /// Translated title.
    #[must_use]
    pub fn title(&self, catalog: &Catalog) -> String {
        catalog.gettext(Self::TITLE).to_string()
    }

    /// The single synthetic choice, echoing `current` as its value.
    #[must_use]
    pub fn choices(&self, current: &str, catalog: &Catalog) -> Vec<FilterChoice> {
        vec![FilterChoice {
            value: current.to_string(),
            label: catalog.gettext(Self::CHOICE_LABEL).to_string(),
            selected: !current.is_empty(),
        }]
    }

    /// The draw-a-rectangle widget is always shown, even over zero records.
    #[must_use]
    pub const fn has_output(&self) -> bool {
        true
    }
}
