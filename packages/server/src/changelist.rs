//! Filtered, paginated result list of one record type.

use map_admin_features::{FeatureCollection, FeatureCollectionBuilder, FeatureError};
use map_admin_filter::FilterOutput;
use map_admin_models::{Record, RequestContext};

use crate::AdminError;
use crate::site::{AdminSite, ModelAdmin};

/// Query parameter holding the 1-based page number.
pub const PAGE_VAR: &str = "p";

/// The records one change-list request shows, plus the filter state.
#[derive(Debug)]
pub struct ChangeList<'a> {
    site: &'a AdminSite,
    admin: &'a ModelAdmin,
    filters: Vec<FilterOutput>,
    full_count: usize,
    result_count: usize,
    page: usize,
    num_pages: usize,
    results: Vec<Record>,
}

impl<'a> ChangeList<'a> {
    /// Applies every filter of `admin` in order and cuts out the requested
    /// page.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::InvalidPage`] if `p` is not a page number in
    /// range, and [`AdminError::Store`] if the record type has no table.
    pub fn build(
        site: &'a AdminSite,
        admin: &'a ModelAdmin,
        request: &RequestContext,
    ) -> Result<Self, AdminError> {
        let mut query = site.store().all(&admin.meta().label())?;
        let full_count = query.count();

        let mut filters = Vec::new();
        for filter in admin.filters() {
            let (narrowed, output) =
                filter.apply(query, request, admin.geometry_fields(), site.catalog());
            query = narrowed;
            filters.push(output);
        }

        let result_count = query.count();
        let per_page = admin.list_per_page();
        let num_pages = result_count.div_ceil(per_page).max(1);

        let page = match request.param(PAGE_VAR) {
            None => 1,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|p| (1..=num_pages).contains(p))
                .ok_or_else(|| AdminError::InvalidPage(raw.to_string()))?,
        };

        let results = query.slice((page - 1) * per_page, per_page);

        log::debug!(
            "{} change list: {result_count}/{full_count} records, page {page}/{num_pages}",
            admin.meta().label()
        );

        Ok(Self {
            site,
            admin,
            filters,
            full_count,
            result_count,
            page,
            num_pages,
            results,
        })
    }

    /// Builds the map features of the current page.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if a hook fails under the propagate policy
    /// or a geometry field holds a non-geometry value.
    pub fn feature_collection(
        &self,
        request: &RequestContext,
    ) -> Result<FeatureCollection, FeatureError> {
        FeatureCollectionBuilder::new(
            self.admin.meta(),
            self.admin.geometry_fields(),
            self.admin.hooks(),
            self.site.urls(),
            self.site.catalog(),
        )
        .with_policy(self.site.policy())
        .build(request, &self.results)
    }

    /// The list page configuration.
    #[must_use]
    pub const fn admin(&self) -> &ModelAdmin {
        self.admin
    }

    /// Applied filters, in order.
    #[must_use]
    pub fn filters(&self) -> &[FilterOutput] {
        &self.filters
    }

    /// Number of records before filtering.
    #[must_use]
    pub const fn full_count(&self) -> usize {
        self.full_count
    }

    /// Number of records after filtering.
    #[must_use]
    pub const fn result_count(&self) -> usize {
        self.result_count
    }

    /// Current page, 1-based.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Number of pages; at least one.
    #[must_use]
    pub const fn num_pages(&self) -> usize {
        self.num_pages
    }

    /// Records of the current page.
    #[must_use]
    pub fn results(&self) -> &[Record] {
        &self.results
    }
}
