#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! List filters for map admin change lists.
//!
//! Filters narrow a [`RecordQuery`] from request parameters and describe
//! the widget the page renders for them. The bounding-box filter is part
//! of every change list unless a deployment opts out; see [`compose`].

pub mod bounding_box;
pub mod field;

use map_admin_models::{Catalog, GeometryFieldSet, RecordQuery, RequestContext};
use strum_macros::{AsRefStr, Display};

pub use bounding_box::BoundingBoxFilter;
pub use field::FieldFilter;

/// One selectable entry of a filter widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChoice {
    /// Query parameter value selecting this choice.
    pub value: String,
    /// Display label.
    pub label: String,
    /// Whether the choice is active for the current request.
    pub selected: bool,
}

/// Which widget a filter renders as. Doubles as the CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FilterWidget {
    /// Draw-a-rectangle map control.
    BoundingBoxFilter,
    /// Plain list of links.
    ChoiceFilter,
}

/// What a filter reports back to the page after being applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutput {
    /// Query parameter the filter reads.
    pub parameter: String,
    /// Translated title.
    pub title: String,
    /// Widget kind.
    pub widget: FilterWidget,
    /// Choices to render.
    pub choices: Vec<FilterChoice>,
    /// Whether the widget is shown at all.
    pub has_output: bool,
}

/// A configured list filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    /// Spatial filter on geometry fields.
    BoundingBox(BoundingBoxFilter),
    /// Exact-value filter on one field.
    Field(FieldFilter),
}

impl ListFilter {
    /// Query parameter the filter reads.
    #[must_use]
    pub fn parameter_name(&self) -> &str {
        match self {
            Self::BoundingBox(_) => BoundingBoxFilter::PARAMETER_NAME,
            Self::Field(filter) => filter.field(),
        }
    }

    /// Applies the filter using the request's parameters.
    ///
    /// `fields` is the record type's geometry field set.
    pub fn apply<Q: RecordQuery>(
        &self,
        query: Q,
        request: &RequestContext,
        fields: &GeometryFieldSet,
        catalog: &Catalog,
    ) -> (Q, FilterOutput) {
        let raw = request.param(self.parameter_name());

        match self {
            Self::BoundingBox(filter) => {
                let (query, current) = filter.apply(query, raw, fields);
                let output = FilterOutput {
                    parameter: BoundingBoxFilter::PARAMETER_NAME.to_string(),
                    title: filter.title(catalog),
                    widget: FilterWidget::BoundingBoxFilter,
                    choices: filter.choices(&current, catalog),
                    has_output: filter.has_output(),
                };
                (query, output)
            }
            Self::Field(filter) => {
                let choices = filter.choices(&query, raw.unwrap_or_default(), catalog);
                let (query, _) = filter.apply(query, raw);
                let output = FilterOutput {
                    parameter: filter.field().to_string(),
                    title: filter.title(catalog),
                    widget: FilterWidget::ChoiceFilter,
                    has_output: choices.len() > 1,
                    choices,
                };
                (query, output)
            }
        }
    }
}

/// Builds the filter list of a change list.
///
/// `configured` keeps its order. `bounding_box` is appended unless a
/// [`BoundingBoxFilter`] is configured already.
#[must_use]
pub fn compose(
    mut configured: Vec<ListFilter>,
    bounding_box: Option<BoundingBoxFilter>,
) -> Vec<ListFilter> {
    let present = configured
        .iter()
        .any(|f| matches!(f, ListFilter::BoundingBox(_)));

    if let Some(filter) = bounding_box.filter(|_| !present) {
        configured.push(ListFilter::BoundingBox(filter));
    }

    configured
}
