//! TOML configuration of the admin server.
//!
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1"
//! port = 8080
//!
//! [admin]
//! root = "/admin"
//! fixtures = "demo/fixtures.json"
//!
//! [locale]
//! "Bounding Box" = "Emprise"
//!
//! [[models]]
//! app_label = "tests"
//! model_name = "waypoint"
//! list_display = ["name"]
//! fields = [
//!     { name = "name", kind = "char" },
//!     { name = "waypoint", kind = "point" },
//! ]
//! ```

use std::path::{Path, PathBuf};

use map_admin_models::{Catalog, FieldDef, ModelMeta};
use serde::Deserialize;
use serde_json::Value;

/// Errors that can occur while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ListenConfig,
    /// Admin site settings.
    #[serde(default)]
    pub admin: AdminConfig,
    /// Message catalog (source string to translation).
    #[serde(default)]
    pub locale: Catalog,
    /// Registered record types, in index order.
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

/// `[server]`
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Interface to bind.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ListenConfig {
    /// Applies the `BIND_ADDR` and `PORT` environment overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(bind_addr) = std::env::var("BIND_ADDR") {
            self.bind_addr = bind_addr;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        self
    }
}

/// `[admin]`
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// URL prefix of the admin pages.
    #[serde(default = "default_root")]
    pub root: String,
    /// Title shown on every page.
    #[serde(default = "default_site_title")]
    pub site_title: String,
    /// JSON fixture file loaded at startup.
    #[serde(default)]
    pub fixtures: Option<PathBuf>,
    /// Leave out features whose hooks fail instead of failing the page.
    #[serde(default)]
    pub skip_failed_features: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            site_title: default_site_title(),
            fixtures: None,
            skip_failed_features: false,
        }
    }
}

/// `[[models]]`: a record type and its list page options.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Owning module.
    pub app_label: String,
    /// Record type identifier.
    pub model_name: String,
    /// Singular display name.
    #[serde(default)]
    pub verbose_name: Option<String>,
    /// Plural display name.
    #[serde(default)]
    pub verbose_name_plural: Option<String>,
    /// Declared fields.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Geometry fields shown on the map. Empty means every geometry field.
    #[serde(default)]
    pub geometry_fields: Vec<String>,
    /// Columns of the result table. Empty means the record label only.
    #[serde(default)]
    pub list_display: Vec<String>,
    /// List filters in order: field names for exact-value filters, or
    /// `"bounding_box"` to place the bounding box filter explicitly.
    #[serde(default)]
    pub list_filter: Vec<String>,
    /// Geometry fields the bounding box filter tests. Empty means the map's
    /// fields.
    #[serde(default)]
    pub bounding_box_fields: Vec<String>,
    /// Rows per page.
    #[serde(default = "default_list_per_page")]
    pub list_per_page: usize,
    /// Whether to add the bounding box filter.
    #[serde(default = "default_true")]
    pub bounding_box_filter: bool,
    /// Fixed line style for every feature.
    #[serde(default)]
    pub line_style: Option<Value>,
    /// Fixed point icon for every feature.
    #[serde(default)]
    pub icon: Option<Value>,
}

impl ModelConfig {
    /// The record type schema.
    #[must_use]
    pub fn meta(&self) -> ModelMeta {
        ModelMeta {
            app_label: self.app_label.clone(),
            model_name: self.model_name.clone(),
            verbose_name: self.verbose_name.clone(),
            verbose_name_plural: self.verbose_name_plural.clone(),
            fields: self.fields.clone(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8080
}

fn default_root() -> String {
    "/admin".to_string()
}

fn default_site_title() -> String {
    "Site administration".to_string()
}

const fn default_list_per_page() -> usize {
    100
}

const fn default_true() -> bool {
    true
}

impl ServerConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid config.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&toml_str)?;
        log::info!(
            "Loaded config {} ({} models)",
            path.display(),
            config.models.len()
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_admin_models::FieldKind;
    use serde_json::json;

    const CONFIG: &str = r##"
[server]
port = 9000

[locale]
"Bounding Box" = "Emprise"

[[models]]
app_label = "tests"
model_name = "deliveryjob"
verbose_name = "Delivery Job"
geometry_fields = ["pickup_point"]
list_display = ["name", "status"]
list_filter = ["bounding_box", "status"]
bounding_box_fields = ["pickup_point", "dropoff_point"]
list_per_page = 20
line_style = { color = "#00FF00", weight = 2 }
fields = [
    { name = "name", kind = "char" },
    { name = "status", kind = "char" },
    { name = "pickup_point", kind = "point", verbose_name = "Pickup" },
    { name = "dropoff_point", kind = "point" },
]

[[models]]
app_label = "tests"
model_name = "waypoint"
bounding_box_filter = false
fields = [{ name = "waypoint", kind = "point" }]
"##;

    #[test]
    fn parses_full_config() {
        let config = ServerConfig::from_toml(CONFIG).unwrap();

        assert_eq!(config.server.bind_addr, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.admin.root, "/admin");
        assert!(!config.admin.skip_failed_features);
        assert_eq!(config.locale.gettext("Bounding Box"), "Emprise");

        let jobs = &config.models[0];
        assert_eq!(jobs.geometry_fields, vec!["pickup_point"]);
        assert_eq!(jobs.list_filter, vec!["bounding_box", "status"]);
        assert_eq!(jobs.bounding_box_fields, vec!["pickup_point", "dropoff_point"]);
        assert_eq!(jobs.list_per_page, 20);
        assert!(jobs.bounding_box_filter);
        assert_eq!(jobs.line_style, Some(json!({"color": "#00FF00", "weight": 2})));
        assert_eq!(jobs.icon, None);

        let meta = jobs.meta();
        assert_eq!(meta.label(), "tests.deliveryjob");
        assert_eq!(meta.field("pickup_point").unwrap().kind, FieldKind::Point);
        assert_eq!(meta.field("pickup_point").unwrap().verbose_name(), "Pickup");

        let waypoints = &config.models[1];
        assert_eq!(waypoints.list_per_page, 100);
        assert!(!waypoints.bounding_box_filter);
        assert!(waypoints.bounding_box_fields.is_empty());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.admin.site_title, "Site administration");
        assert!(config.models.is_empty());
    }

    #[test]
    fn rejects_unknown_field_kind() {
        let toml_str = r#"
[[models]]
app_label = "tests"
model_name = "waypoint"
fields = [{ name = "waypoint", kind = "hexagon" }]
"#;
        assert!(matches!(
            ServerConfig::from_toml(toml_str),
            Err(ConfigError::Parse(_))
        ));
    }
}
