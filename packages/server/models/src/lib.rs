#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the map admin server.
//!
//! These are the JSON shapes of the `/api` endpoints. Change-list data is
//! served as `GeoJSON` by the admin routes and is not described here.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// A registered record type as returned by `/api/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiModel {
    /// `app_label.model_name`.
    pub label: String,
    /// Owning module.
    pub app_label: String,
    /// Record type identifier.
    pub model_name: String,
    /// Singular display name.
    pub verbose_name: String,
    /// Plural display name.
    pub verbose_name_plural: String,
    /// Geometry fields rendered on the map, in feature order.
    pub geometry_fields: Vec<String>,
    /// Number of stored records.
    pub record_count: usize,
    /// Change-list page URL.
    pub changelist_url: String,
    /// `GeoJSON` endpoint URL.
    pub geojson_url: String,
}

/// Error body returned by failing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
