//! HTTP handler functions for the admin server.

use std::collections::BTreeMap;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use map_admin_features::FeatureCollection;
use map_admin_models::RequestContext;
use map_admin_server_models::{ApiError, ApiHealth, ApiModel};

use crate::changelist::{ChangeList, PAGE_VAR};
use crate::{AdminError, AppState, pages};

const HTML: &str = "text/html; charset=utf-8";

fn request_context(
    req: &HttpRequest,
    params: web::Query<BTreeMap<String, String>>,
) -> RequestContext {
    RequestContext::new(req.path(), params.into_inner())
}

fn error_response(e: &AdminError) -> HttpResponse {
    let status = match e {
        AdminError::UnknownModel(_) | AdminError::UnknownRecord { .. } => StatusCode::NOT_FOUND,
        AdminError::InvalidPage(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        log::error!("Request failed: {e}");
    }
    HttpResponse::build(status).json(ApiError::new(e.to_string()))
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/models`
///
/// Lists the registered record types with their map fields and URLs.
pub async fn models(state: web::Data<AppState>) -> HttpResponse {
    let site = &state.site;
    let models: Vec<ApiModel> = site
        .admins()
        .map(|admin| {
            let meta = admin.meta();
            let label = meta.label();
            ApiModel {
                record_count: site.store().all(&label).map_or(0, |q| q.count()),
                label,
                app_label: meta.app_label.clone(),
                model_name: meta.model_name.clone(),
                verbose_name: meta.verbose_name(),
                verbose_name_plural: meta.verbose_name_plural(),
                geometry_fields: admin.geometry_fields().as_slice().to_vec(),
                changelist_url: site.urls().changelist(meta),
                geojson_url: site.urls().geojson(meta),
            }
        })
        .collect();

    HttpResponse::Ok().json(models)
}

/// `GET {root}/`
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(HTML)
        .body(pages::index_page(&state.site))
}

/// `GET {root}/{app_label}/{model_name}/`
///
/// Renders the change list with its map. If the change list cannot be
/// built for the request, the first page is listed instead, the map is
/// left empty and the error is shown on the page.
pub async fn changelist(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    params: web::Query<BTreeMap<String, String>>,
    req: HttpRequest,
) -> HttpResponse {
    let (app_label, model_name) = path.into_inner();
    let site = &state.site;
    let admin = match site.admin(&app_label, &model_name) {
        Ok(admin) => admin,
        Err(e) => return error_response(&e),
    };
    let request = request_context(&req, params);

    let (cl, features, error) = match ChangeList::build(site, admin, &request) {
        Ok(cl) => match cl.feature_collection(&request) {
            Ok(features) => (Some(cl), features, None),
            Err(e) => return error_response(&AdminError::from(e)),
        },
        Err(e) => {
            log::warn!("Change list for {app_label}.{model_name} failed: {e}");
            let mut fallback = request.clone();
            fallback.params.remove(PAGE_VAR);
            (
                ChangeList::build(site, admin, &fallback).ok(),
                FeatureCollection::default(),
                Some(e.to_string()),
            )
        }
    };

    match pages::changelist_page(site, admin, cl.as_ref(), &features, error.as_deref(), &request) {
        Ok(html) => HttpResponse::Ok().content_type(HTML).body(html),
        Err(e) => error_response(&AdminError::Feature(e)),
    }
}

/// `GET {root}/{app_label}/{model_name}/geojson/`
///
/// The change list's `FeatureCollection`, with the same filtering and
/// pagination parameters as the page.
pub async fn geojson(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    params: web::Query<BTreeMap<String, String>>,
    req: HttpRequest,
) -> HttpResponse {
    let (app_label, model_name) = path.into_inner();
    let request = request_context(&req, params);

    let result = state
        .site
        .admin(&app_label, &model_name)
        .and_then(|admin| ChangeList::build(&state.site, admin, &request))
        .and_then(|cl| cl.feature_collection(&request).map_err(AdminError::from));

    match result {
        Ok(features) => HttpResponse::Ok().json(features),
        Err(e) => error_response(&e),
    }
}

/// `GET {root}/{app_label}/{model_name}/{pk}/change/`
pub async fn change(
    state: web::Data<AppState>,
    path: web::Path<(String, String, i64)>,
) -> HttpResponse {
    let (app_label, model_name, pk) = path.into_inner();
    let site = &state.site;

    let result = site.admin(&app_label, &model_name).and_then(|admin| {
        let label = admin.meta().label();
        match site.store().get(&label, pk)? {
            Some(record) => Ok(pages::change_page(site, admin, record)),
            None => Err(AdminError::UnknownRecord { model: label, pk }),
        }
    });

    match result {
        Ok(html) => HttpResponse::Ok().content_type(HTML).body(html),
        Err(e) => error_response(&e),
    }
}
