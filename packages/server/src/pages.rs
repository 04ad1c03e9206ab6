//! HTML rendering of the admin pages.
//!
//! Pages are assembled from strings. Every value that comes from a record
//! or a request goes through [`escape`].

use map_admin_features::html::{escape, json_for_script};
use map_admin_features::{FeatureCollection, FeatureError};
use map_admin_filter::{FilterOutput, FilterWidget};
use map_admin_models::{Record, RequestContext};

use crate::changelist::{ChangeList, PAGE_VAR};
use crate::site::{AdminSite, ModelAdmin};

const LEAFLET: &str = "https://unpkg.com/leaflet@1.9.4/dist";
const LEAFLET_DRAW: &str = "https://unpkg.com/leaflet-draw@1.0.4/dist";

/// Map script. Reads the `js` FeatureCollection, fits the map to it and
/// turns a drawn rectangle into a `bounding_box` query parameter.
const MAP_SCRIPT: &str = r#"(function () {
  var el = document.getElementById("leaflet_admin_list_map");
  var map = L.map(el).setView([0, 0], 2);
  L.tileLayer("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", {
    attribution: "&copy; OpenStreetMap contributors"
  }).addTo(map);
  var layer = L.geoJSON(js, {
    style: function (f) { return f.properties.line_style || {}; },
    pointToLayer: function (f, latlng) {
      var s = f.properties.point_style;
      return s ? L.marker(latlng, {icon: L.icon(s.icon)}) : L.marker(latlng);
    },
    onEachFeature: function (f, l) {
      if (f.properties.popup) { l.bindPopup(f.properties.popup); }
      if (f.properties.tooltip) { l.bindTooltip(f.properties.tooltip); }
    }
  }).addTo(map);
  if (layer.getLayers().length) { map.fitBounds(layer.getBounds()); }
  var current = el.getAttribute("data-bounding-box");
  if (current) {
    var c = current.split(",").map(Number);
    L.rectangle([[c[1], c[0]], [c[3], c[2]]], {fill: false, dashArray: "4"}).addTo(map);
  }
  map.addControl(new L.Control.Draw({
    draw: {polyline: false, polygon: false, circle: false, marker: false, circlemarker: false},
    edit: false
  }));
  map.on(L.Draw.Event.CREATED, function (e) {
    var b = e.layer.getBounds();
    var params = new URLSearchParams(window.location.search);
    params.delete("p");
    params.set("bounding_box", [b.getWest(), b.getSouth(), b.getEast(), b.getNorth()].join(","));
    window.location.search = params.toString();
  });
})();"#;

fn layout(site: &AdminSite, title: &str, head: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} | {site_title}</title>\n{head}</head>\n<body>\n\
         <h1><a href=\"{index}\">{site_title}</a></h1>\n{body}</body>\n</html>\n",
        title = escape(title),
        site_title = escape(site.title()),
        index = escape(&site.urls().index()),
    )
}

/// Query string selecting `value` for `parameter`, keeping the other
/// parameters of `request`. The page number is dropped unless it is the
/// parameter being set.
fn query_with(request: &RequestContext, parameter: &str, value: &str) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (name, existing) in &request.params {
        if name != parameter && name != PAGE_VAR {
            query.append_pair(name, existing);
        }
    }
    if !value.is_empty() {
        query.append_pair(parameter, value);
    }
    format!("?{}", query.finish())
}

fn render_filter(site: &AdminSite, filter: &FilterOutput, request: &RequestContext) -> String {
    if !filter.has_output {
        return String::new();
    }

    let heading = site
        .catalog()
        .format("By {filter_title}", &[("filter_title", filter.title.as_str())]);
    let items: String = filter
        .choices
        .iter()
        .map(|choice| {
            let selected = if choice.selected { " class=\"selected\"" } else { "" };
            format!(
                "<li{selected}><a href=\"{href}\" data-value=\"{value}\">{label}</a></li>\n",
                href = escape(&query_with(request, &filter.parameter, &choice.value)),
                value = escape(&choice.value),
                label = escape(&choice.label),
            )
        })
        .collect();

    format!(
        "<h3>{heading}</h3>\n<ul class=\"{class}\" data-parameter=\"{parameter}\">\n{items}</ul>\n",
        heading = escape(&heading),
        class = filter.widget,
        parameter = escape(&filter.parameter),
    )
}

fn column_header(admin: &ModelAdmin, column: &str) -> String {
    admin
        .meta()
        .field(column)
        .map_or_else(|| column.to_string(), |f| f.verbose_name())
}

fn render_results(site: &AdminSite, admin: &ModelAdmin, results: &[Record]) -> String {
    let columns = admin.list_display();
    let catalog = site.catalog();

    let header: String = if columns.is_empty() {
        format!("<th>{}</th>", escape(&admin.meta().verbose_name()))
    } else {
        columns
            .iter()
            .map(|c| format!("<th>{}</th>", escape(catalog.gettext(&column_header(admin, c)))))
            .collect()
    };

    let rows: String = results
        .iter()
        .map(|record| {
            let href = escape(&site.urls().change(admin.meta(), record.pk));
            let cells: String = if columns.is_empty() {
                format!("<th><a href=\"{href}\">{}</a></th>", escape(&record.label))
            } else {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let value = escape(&record.value(c).to_string());
                        if i == 0 {
                            format!("<th><a href=\"{href}\">{value}</a></th>")
                        } else {
                            format!("<td>{value}</td>")
                        }
                    })
                    .collect()
            };
            format!("<tr>{cells}</tr>\n")
        })
        .collect();

    format!(
        "<table id=\"result_list\">\n<thead><tr>{header}</tr></thead>\n\
         <tbody>\n{rows}</tbody>\n</table>\n"
    )
}

fn render_paginator(
    site: &AdminSite,
    admin: &ModelAdmin,
    cl: &ChangeList<'_>,
    request: &RequestContext,
) -> String {
    let meta = admin.meta();
    let noun = if cl.result_count() == 1 {
        meta.verbose_name()
    } else {
        meta.verbose_name_plural()
    };

    let pages: String = if cl.num_pages() > 1 {
        (1..=cl.num_pages())
            .map(|page| {
                if page == cl.page() {
                    format!("<span class=\"this-page\">{page}</span> ")
                } else {
                    let href = query_with(request, PAGE_VAR, &page.to_string());
                    format!("<a href=\"{}\">{page}</a> ", escape(&href))
                }
            })
            .collect()
    } else {
        String::new()
    };

    let noun = site.catalog().gettext(&noun);
    let count = format!("{} {noun}", cl.result_count());

    format!("<p class=\"paginator\">{pages}{}</p>\n", escape(&count))
}

/// Renders a change-list page.
///
/// `cl` is `None` when the change list could not be built; the page then
/// shows `error` in place of the results and an empty map.
///
/// # Errors
///
/// Returns [`FeatureError::Json`] if the features cannot be serialized.
pub fn changelist_page(
    site: &AdminSite,
    admin: &ModelAdmin,
    cl: Option<&ChangeList<'_>>,
    features: &FeatureCollection,
    error: Option<&str>,
    request: &RequestContext,
) -> Result<String, FeatureError> {
    let verbose_name = admin.meta().verbose_name();
    let title = site.catalog().format(
        "Select {model_verbose_name} to change",
        &[("model_verbose_name", verbose_name.as_str())],
    );

    let current_box = cl
        .and_then(|cl| {
            cl.filters()
                .iter()
                .find(|f| f.widget == FilterWidget::BoundingBoxFilter)
        })
        .and_then(|f| f.choices.first())
        .map(|c| c.value.clone())
        .unwrap_or_default();

    let head = format!(
        "<link rel=\"stylesheet\" href=\"{LEAFLET}/leaflet.css\">\n\
         <link rel=\"stylesheet\" href=\"{LEAFLET_DRAW}/leaflet.draw.css\">\n\
         <script src=\"{LEAFLET}/leaflet.js\"></script>\n\
         <script src=\"{LEAFLET_DRAW}/leaflet.draw.js\"></script>\n"
    );

    let mut body = format!("<h2>{}</h2>\n", escape(&title));
    if let Some(error) = error {
        body.push_str(&format!("<p class=\"errornote\">{}</p>\n", escape(error)));
    }
    body.push_str(&format!(
        "<div id=\"leaflet_admin_list_map\" style=\"height: 400px\" \
         data-bounding-box=\"{}\" data-version=\"{}\"></div>\n",
        escape(&current_box),
        env!("CARGO_PKG_VERSION"),
    ));

    if let Some(cl) = cl {
        body.push_str("<div id=\"changelist-filter\">\n");
        for filter in cl.filters() {
            body.push_str(&render_filter(site, filter, request));
        }
        body.push_str("</div>\n");
        body.push_str(&render_results(site, admin, cl.results()));
        body.push_str(&render_paginator(site, admin, cl, request));
    }

    body.push_str(&format!(
        "<script>\nvar js = {};\n{MAP_SCRIPT}\n</script>\n",
        json_for_script(&features.to_json()?)
    ));

    Ok(layout(site, &title, &head, &body))
}

/// Renders the index of registered record types.
#[must_use]
pub fn index_page(site: &AdminSite) -> String {
    let items: String = site
        .admins()
        .map(|admin| {
            let meta = admin.meta();
            format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                escape(&site.urls().changelist(meta)),
                escape(site.catalog().gettext(&meta.verbose_name_plural())),
            )
        })
        .collect();

    let title = site.catalog().gettext("Site administration").to_string();
    layout(site, &title, "", &format!("<ul class=\"models\">\n{items}</ul>\n"))
}

/// Renders a read-only record page.
#[must_use]
pub fn change_page(site: &AdminSite, admin: &ModelAdmin, record: &Record) -> String {
    let meta = admin.meta();
    let rows: String = meta
        .fields
        .iter()
        .map(|field| {
            format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                escape(site.catalog().gettext(&field.verbose_name())),
                escape(&record.value(&field.name).to_string()),
            )
        })
        .collect();

    let plural = meta.verbose_name_plural();
    let back = site.catalog().format(
        "Back to {model_verbose_name_plural}",
        &[("model_verbose_name_plural", plural.as_str())],
    );
    let body = format!(
        "<h2>{label}</h2>\n<table class=\"record\">\n{rows}</table>\n\
         <p><a href=\"{href}\">{back}</a></p>\n",
        label = escape(&record.label),
        href = escape(&site.urls().changelist(meta)),
        back = escape(&back),
    );

    layout(site, &record.label, "", &body)
}
