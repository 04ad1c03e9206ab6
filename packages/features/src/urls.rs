//! Reverse URL generation for admin pages.

use map_admin_models::ModelMeta;

/// Builds admin URLs below a fixed root path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUrls {
    root: String,
}

impl Default for AdminUrls {
    fn default() -> Self {
        Self::new("/admin")
    }
}

impl AdminUrls {
    /// Creates a resolver rooted at `root` (e.g. `"/admin"`).
    #[must_use]
    pub fn new(root: &str) -> Self {
        let trimmed = root.trim_end_matches('/');
        let root = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        Self { root }
    }

    /// The root path without trailing slash (`""` when mounted at `/`).
    #[must_use]
    pub fn root(&self) -> &str {
        if self.root == "/" { "" } else { &self.root }
    }

    /// `{root}/`
    #[must_use]
    pub fn index(&self) -> String {
        format!("{}/", self.root())
    }

    /// `{root}/{app_label}/{model_name}/`
    #[must_use]
    pub fn changelist(&self, meta: &ModelMeta) -> String {
        format!("{}/{}/{}/", self.root(), meta.app_label, meta.model_name)
    }

    /// `{root}/{app_label}/{model_name}/geojson/`
    #[must_use]
    pub fn geojson(&self, meta: &ModelMeta) -> String {
        format!("{}geojson/", self.changelist(meta))
    }

    /// `{root}/{app_label}/{model_name}/{pk}/change/`
    #[must_use]
    pub fn change(&self, meta: &ModelMeta, pk: i64) -> String {
        format!("{}{pk}/change/", self.changelist(meta))
    }
}
