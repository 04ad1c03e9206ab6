#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web admin server with map-augmented change lists.
//!
//! Every registered record type gets a change-list page showing its
//! records both as a table and on a Leaflet map. The map data is a
//! `GeoJSON` `FeatureCollection` embedded in the page and also served on
//! its own at `{root}/{app}/{model}/geojson/`. A bounding box drawn on the
//! map narrows the list through the `bounding_box` query parameter.

pub mod changelist;
pub mod config;
mod handlers;
pub mod pages;
pub mod site;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use map_admin_features::{AdminUrls, FeatureError};
use map_admin_models::SchemaError;
use map_admin_store::StoreError;

pub use config::{ConfigError, ServerConfig};
pub use site::{AdminSite, ModelAdmin};

/// Errors that can occur while serving admin requests or building the
/// site.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// No admin is registered for the record type.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// No record with the primary key exists.
    #[error("{model} has no record with pk={pk}")]
    UnknownRecord {
        /// Record type label.
        model: String,
        /// Requested primary key.
        pk: i64,
    },

    /// `list_display` or `list_filter` names an unusable field.
    #[error("{model} has no usable field {field}")]
    UnknownColumn {
        /// Record type label.
        model: String,
        /// The offending field name.
        field: String,
    },

    /// The requested page does not exist.
    #[error("Invalid page: {0:?}")]
    InvalidPage(String),

    /// Schema validation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Record storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Feature building failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),
}

/// Shared application state.
pub struct AppState {
    /// The admin site with its registered record types and records.
    pub site: AdminSite,
}

/// Registers the API and admin routes.
pub fn router(cfg: &mut web::ServiceConfig, urls: &AdminUrls) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/models", web::get().to(handlers::models)),
    )
    .service(
        web::scope(urls.root())
            .route("/", web::get().to(handlers::index))
            .route("/{app_label}/{model_name}/", web::get().to(handlers::changelist))
            .route(
                "/{app_label}/{model_name}/geojson/",
                web::get().to(handlers::geojson),
            )
            .route(
                "/{app_label}/{model_name}/{pk}/change/",
                web::get().to(handlers::change),
            ),
    );
}

/// Starts the admin server.
///
/// Builds the admin site from `config`, loads its fixtures and serves it
/// until the process is stopped. The caller provides the async runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the site cannot be built, or the
/// HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    log::info!("Building admin site...");
    let site = AdminSite::from_config(&config).map_err(std::io::Error::other)?;
    let urls = site.urls().clone();

    let state = web::Data::new(AppState { site });

    let listen = config.server.with_env_overrides();
    log::info!(
        "Starting server on {}:{} (admin at {})",
        listen.bind_addr,
        listen.port,
        urls.index()
    );

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(|c| router(c, &urls))
    })
    .bind((listen.bind_addr, listen.port))?
    .run()
    .await
}
