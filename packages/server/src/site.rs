//! Admin site registry: per-record-type list page configuration.

use std::collections::BTreeMap;

use map_admin_features::{AdminUrls, FeatureHooks, HookContext, HookFailurePolicy, HookResult};
use map_admin_filter::{BoundingBoxFilter, FieldFilter, ListFilter, compose};
use map_admin_models::{Catalog, GeometryFieldSet, ModelMeta};
use map_admin_store::{RecordStore, load_fixtures_file};
use serde_json::Value;

use crate::AdminError;
use crate::config::{ModelConfig, ServerConfig};

/// List page configuration of one record type.
///
/// Built and validated once at registration; immutable afterwards.
#[derive(Debug, Clone)]
pub struct ModelAdmin {
    meta: ModelMeta,
    geometry_fields: GeometryFieldSet,
    list_display: Vec<String>,
    list_filter: Vec<ListFilter>,
    bounding_box: BoundingBoxFilter,
    bounding_box_filter: bool,
    list_per_page: usize,
    hooks: FeatureHooks,
}

impl ModelAdmin {
    /// Creates a list page configuration with defaults: every geometry
    /// field on the map, the record label as the only column, and the
    /// bounding box filter.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Schema`] if the schema declares a field twice.
    pub fn new(meta: ModelMeta) -> Result<Self, AdminError> {
        meta.validate()?;
        let geometry_fields = GeometryFieldSet::discover(&meta);

        Ok(Self {
            meta,
            geometry_fields,
            list_display: Vec::new(),
            list_filter: Vec::new(),
            bounding_box: BoundingBoxFilter::new(),
            bounding_box_filter: true,
            list_per_page: 100,
            hooks: FeatureHooks::default(),
        })
    }

    /// Restricts the map to `names`. An empty list keeps every geometry
    /// field.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Schema`] if a name is not a geometry field.
    pub fn with_geometry_fields(mut self, names: &[String]) -> Result<Self, AdminError> {
        self.geometry_fields = GeometryFieldSet::configured(&self.meta, names)?;
        Ok(self)
    }

    /// Sets the result table columns.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::UnknownColumn`] if a column is not a field.
    pub fn with_list_display(mut self, columns: Vec<String>) -> Result<Self, AdminError> {
        if let Some(column) = columns.iter().find(|c| self.meta.field(c).is_none()) {
            return Err(AdminError::UnknownColumn {
                model: self.meta.label(),
                field: column.clone(),
            });
        }
        self.list_display = columns;
        Ok(self)
    }

    /// Adds list filters, in order.
    ///
    /// `"bounding_box"` places the bounding box filter at that position.
    /// Any other name adds an exact-value filter on that field.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::UnknownColumn`] if a name is neither
    /// `"bounding_box"` nor a non-geometry field.
    pub fn with_list_filter(mut self, names: &[String]) -> Result<Self, AdminError> {
        for name in names {
            if name == BoundingBoxFilter::PARAMETER_NAME {
                self.list_filter
                    .push(ListFilter::BoundingBox(self.bounding_box.clone()));
                continue;
            }
            let field = self
                .meta
                .field(name)
                .filter(|f| !f.kind.is_geometry())
                .ok_or_else(|| AdminError::UnknownColumn {
                    model: self.meta.label(),
                    field: name.clone(),
                })?;
            self.list_filter
                .push(ListFilter::Field(FieldFilter::new(name, field.verbose_name())));
        }
        Ok(self)
    }

    /// Restricts the bounding box filter to `names` instead of the map's
    /// geometry fields. An empty list keeps the map's fields.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Schema`] if a name is not a geometry field.
    pub fn with_bounding_box_fields(mut self, names: &[String]) -> Result<Self, AdminError> {
        self.bounding_box = if names.is_empty() {
            BoundingBoxFilter::new()
        } else {
            BoundingBoxFilter::new().with_fields(GeometryFieldSet::configured(&self.meta, names)?)
        };
        for filter in &mut self.list_filter {
            if let ListFilter::BoundingBox(existing) = filter {
                existing.clone_from(&self.bounding_box);
            }
        }
        Ok(self)
    }

    /// Enables or disables the bounding box filter.
    #[must_use]
    pub const fn with_bounding_box_filter(mut self, enabled: bool) -> Self {
        self.bounding_box_filter = enabled;
        self
    }

    /// Sets the page size. Zero is treated as one.
    #[must_use]
    pub fn with_list_per_page(mut self, list_per_page: usize) -> Self {
        self.list_per_page = list_per_page.max(1);
        self
    }

    /// Sets the feature hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: FeatureHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Builds a list page configuration from a `[[models]]` entry.
    ///
    /// Fixed `line_style` and `icon` tables become constant hooks.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError`] if the entry does not validate against its
    /// own schema.
    pub fn from_config(config: &ModelConfig) -> Result<Self, AdminError> {
        let mut hooks = FeatureHooks::default();
        if let Some(style) = config.line_style.clone() {
            hooks = hooks.with_line_style(constant(style));
        }
        if let Some(icon) = config.icon.clone() {
            hooks = hooks.with_icon_style(constant(icon));
        }

        Ok(Self::new(config.meta())?
            .with_geometry_fields(&config.geometry_fields)?
            .with_bounding_box_fields(&config.bounding_box_fields)?
            .with_list_display(config.list_display.clone())?
            .with_list_filter(&config.list_filter)?
            .with_bounding_box_filter(config.bounding_box_filter)
            .with_list_per_page(config.list_per_page)
            .with_hooks(hooks))
    }

    /// Record type schema.
    #[must_use]
    pub const fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    /// Geometry fields rendered on the map.
    #[must_use]
    pub const fn geometry_fields(&self) -> &GeometryFieldSet {
        &self.geometry_fields
    }

    /// Result table columns. Empty means the record label only.
    #[must_use]
    pub fn list_display(&self) -> &[String] {
        &self.list_display
    }

    /// Filters in the order they are applied.
    #[must_use]
    pub fn filters(&self) -> Vec<ListFilter> {
        compose(
            self.list_filter.clone(),
            self.bounding_box_filter.then(|| self.bounding_box.clone()),
        )
    }

    /// Rows per page.
    #[must_use]
    pub const fn list_per_page(&self) -> usize {
        self.list_per_page
    }

    /// Feature hooks.
    #[must_use]
    pub const fn hooks(&self) -> &FeatureHooks {
        &self.hooks
    }
}

fn constant(
    value: Value,
) -> impl Fn(&HookContext<'_>) -> HookResult<Value> + Send + Sync + 'static {
    move |_| Ok(Some(value.clone()))
}

/// The admin site: registered record types and their records.
#[derive(Debug)]
pub struct AdminSite {
    title: String,
    urls: AdminUrls,
    catalog: Catalog,
    policy: HookFailurePolicy,
    admins: BTreeMap<String, ModelAdmin>,
    store: RecordStore,
}

impl Default for AdminSite {
    fn default() -> Self {
        Self::new("Site administration", AdminUrls::default(), Catalog::default())
    }
}

impl AdminSite {
    /// Creates an empty site.
    #[must_use]
    pub fn new(title: impl Into<String>, urls: AdminUrls, catalog: Catalog) -> Self {
        Self {
            title: title.into(),
            urls,
            catalog,
            policy: HookFailurePolicy::default(),
            admins: BTreeMap::new(),
            store: RecordStore::new(),
        }
    }

    /// Sets what happens when a feature hook fails.
    #[must_use]
    pub const fn with_policy(mut self, policy: HookFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds a site from configuration and loads its fixtures.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError`] if a model does not validate or the
    /// fixtures cannot be loaded.
    pub fn from_config(config: &ServerConfig) -> Result<Self, AdminError> {
        let policy = if config.admin.skip_failed_features {
            HookFailurePolicy::SkipFeature
        } else {
            HookFailurePolicy::Propagate
        };
        let mut site = Self::new(
            config.admin.site_title.clone(),
            AdminUrls::new(&config.admin.root),
            config.locale.clone(),
        )
        .with_policy(policy);

        for model in &config.models {
            site.register(ModelAdmin::from_config(model)?)?;
        }

        if let Some(path) = &config.admin.fixtures {
            load_fixtures_file(&mut site.store, path)?;
        }

        Ok(site)
    }

    /// Registers a record type.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Store`] if the record type is already
    /// registered.
    pub fn register(&mut self, admin: ModelAdmin) -> Result<(), AdminError> {
        let label = admin.meta().label();
        self.store.register(admin.meta().clone())?;
        log::info!(
            "Registered {label} (map fields: {:?})",
            admin.geometry_fields().as_slice()
        );
        self.admins.insert(label, admin);
        Ok(())
    }

    /// Site title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// URL resolver.
    #[must_use]
    pub const fn urls(&self) -> &AdminUrls {
        &self.urls
    }

    /// Message catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Hook failure policy.
    #[must_use]
    pub const fn policy(&self) -> HookFailurePolicy {
        self.policy
    }

    /// Record storage.
    #[must_use]
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Mutable record storage, for loading records.
    pub const fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    /// Registered admins ordered by label.
    pub fn admins(&self) -> impl Iterator<Item = &ModelAdmin> {
        self.admins.values()
    }

    /// Looks up the admin of `app_label.model_name`.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::UnknownModel`] if none is registered.
    pub fn admin(&self, app_label: &str, model_name: &str) -> Result<&ModelAdmin, AdminError> {
        let label = format!("{app_label}.{model_name}");
        self.admins
            .get(&label)
            .ok_or(AdminError::UnknownModel(label))
    }
}
