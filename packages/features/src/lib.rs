#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `GeoJSON` `FeatureCollection` building for admin list pages.
//!
//! Every (record, geometry field) pair with a non-null value becomes one
//! Feature. Records are visited in collection order and fields in the
//! order of the [`GeometryFieldSet`], so the output order is stable for a
//! given input. Popup, tooltip and style properties come from the
//! record type's [`FeatureHooks`].

pub mod hooks;
pub mod html;
pub mod urls;

use geo::Geometry;
use map_admin_models::{
    Catalog, FieldValue, GeometryFieldSet, ModelMeta, Record, RequestContext,
};
use serde::Serialize;
use serde_json::Value;

pub use hooks::{FeatureHooks, HookContext, HookError, HookResult, StyleHook, TextHook};
pub use urls::AdminUrls;

/// Errors that can occur while building a `FeatureCollection`.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// A popup, tooltip, style or verbose name hook failed.
    #[error("{hook} hook failed for {model} pk={pk} field={field}: {source}")]
    Hook {
        /// Which hook failed.
        hook: &'static str,
        /// Record type label.
        model: String,
        /// Primary key of the record.
        pk: i64,
        /// Geometry field being rendered.
        field: String,
        /// The hook's error.
        source: HookError,
    },

    /// A listed geometry field holds a non-geometry value.
    #[error("{model}.{field} of pk={pk} holds a non-geometry value")]
    NotAGeometry {
        /// Record type label.
        model: String,
        /// Primary key of the record.
        pk: i64,
        /// The offending field.
        field: String,
    },

    /// Serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What to do when a hook fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HookFailurePolicy {
    /// Fail the whole collection.
    #[default]
    Propagate,
    /// Log the failure and leave that Feature out.
    SkipFeature,
}

/// `properties.point_style`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointStyle {
    /// Icon description understood by the map frontend.
    pub icon: Value,
}

/// `properties` of one Feature. Serialized in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureProperties {
    /// Geometry field name.
    pub field: String,
    /// Owning module of the record type.
    pub app_label: String,
    /// Record type identifier.
    pub model_name: String,
    /// Record primary key.
    pub pk: i64,
    /// Popup HTML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
    /// Tooltip text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    /// Marker style for points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_style: Option<PointStyle>,
    /// Stroke and fill style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_style: Option<Value>,
}

/// One `GeoJSON` Feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    /// Always `"Feature"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// The geometry in `GeoJSON` encoding.
    pub geometry: geojson::Geometry,
    /// Feature properties.
    pub properties: FeatureProperties,
}

/// A `GeoJSON` `FeatureCollection`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Features in record order, then field order.
    pub features: Vec<Feature>,
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FeatureCollection {
    /// Wraps `features`.
    #[must_use]
    pub const fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether there are no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Serializes to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, FeatureError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Whether a style value counts as set. `null`, `false`, `0`, `""`, `[]`
/// and `{}` do not.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Encodes a stored geometry as a `GeoJSON` geometry object.
#[must_use]
pub fn encode_geometry(geometry: &Geometry<f64>) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(geometry))
}

/// Builds `FeatureCollection`s for one record type.
pub struct FeatureCollectionBuilder<'a> {
    meta: &'a ModelMeta,
    fields: &'a GeometryFieldSet,
    hooks: &'a FeatureHooks,
    urls: &'a AdminUrls,
    catalog: &'a Catalog,
    policy: HookFailurePolicy,
}

impl<'a> FeatureCollectionBuilder<'a> {
    /// Creates a builder that propagates hook failures.
    #[must_use]
    pub fn new(
        meta: &'a ModelMeta,
        fields: &'a GeometryFieldSet,
        hooks: &'a FeatureHooks,
        urls: &'a AdminUrls,
        catalog: &'a Catalog,
    ) -> Self {
        Self {
            meta,
            fields,
            hooks,
            urls,
            catalog,
            policy: HookFailurePolicy::default(),
        }
    }

    /// Sets the hook failure policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: HookFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds one Feature per non-null geometry field of every record.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::NotAGeometry`] if a listed field holds a
    /// non-geometry value, and [`FeatureError::Hook`] if a hook fails
    /// under [`HookFailurePolicy::Propagate`].
    pub fn build(
        &self,
        request: &RequestContext,
        records: &[Record],
    ) -> Result<FeatureCollection, FeatureError> {
        let mut features = Vec::new();

        for record in records {
            for field in self.fields.iter() {
                let geometry = match record.value(field) {
                    FieldValue::Null => continue,
                    FieldValue::Geometry(g) => g,
                    _ => {
                        return Err(FeatureError::NotAGeometry {
                            model: self.meta.label(),
                            pk: record.pk,
                            field: field.to_string(),
                        });
                    }
                };

                let ctx = HookContext {
                    request,
                    meta: self.meta,
                    field,
                    record,
                    records,
                    urls: self.urls,
                    catalog: self.catalog,
                    hooks: self.hooks,
                };

                match self.feature(&ctx, geometry) {
                    Ok(feature) => features.push(feature),
                    Err(e @ FeatureError::Hook { .. })
                        if self.policy == HookFailurePolicy::SkipFeature =>
                    {
                        log::warn!("Omitting feature: {e}");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        log::debug!(
            "Built {} features for {} {} records",
            features.len(),
            records.len(),
            self.meta.label()
        );

        Ok(FeatureCollection::new(features))
    }

    fn feature(
        &self,
        ctx: &HookContext<'_>,
        geometry: &Geometry<f64>,
    ) -> Result<Feature, FeatureError> {
        let popup = self.run("popup", ctx, self.hooks.popup(ctx))?;
        let tooltip = self.run("tooltip", ctx, self.hooks.tooltip(ctx))?;
        let icon = self.run("icon_style", ctx, self.hooks.icon_style(ctx))?;
        let line_style = self.run("line_style", ctx, self.hooks.line_style(ctx))?;

        Ok(Feature {
            kind: "Feature",
            geometry: encode_geometry(geometry),
            properties: FeatureProperties {
                field: ctx.field.to_string(),
                app_label: self.meta.app_label.clone(),
                model_name: self.meta.model_name.clone(),
                pk: ctx.record.pk,
                popup: popup.filter(|s| !s.is_empty()),
                tooltip: tooltip.filter(|s| !s.is_empty()),
                point_style: icon.filter(is_truthy).map(|icon| PointStyle { icon }),
                line_style: line_style.filter(is_truthy),
            },
        })
    }

    fn run<T>(
        &self,
        hook: &'static str,
        ctx: &HookContext<'_>,
        result: HookResult<T>,
    ) -> Result<Option<T>, FeatureError> {
        result.map_err(|source| FeatureError::Hook {
            hook,
            model: self.meta.label(),
            pk: ctx.record.pk,
            field: ctx.field.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Point, polygon};
    use map_admin_models::{FieldDef, FieldKind};
    use serde_json::json;

    fn delivery_job() -> ModelMeta {
        ModelMeta::new("tests", "deliveryjob")
            .with_verbose_name("Delivery Job")
            .with_field(FieldDef::new("name", FieldKind::Char))
            .with_field(
                FieldDef::new("pickup_point", FieldKind::Point).with_verbose_name("Pickup Point"),
            )
            .with_field(
                FieldDef::new("dropoff_point", FieldKind::Point).with_verbose_name("Dropoff Point"),
            )
    }

    fn job(pk: i64, pickup: Option<(f64, f64)>, dropoff: Option<(f64, f64)>) -> Record {
        let mut record = Record::new(pk, format!("Delivery Test {pk}"));
        if let Some((x, y)) = pickup {
            record = record.with_geometry("pickup_point", Point::new(x, y));
        }
        if let Some((x, y)) = dropoff {
            record = record.with_geometry("dropoff_point", Point::new(x, y));
        }
        record
    }

    struct Fixture {
        meta: ModelMeta,
        fields: GeometryFieldSet,
        urls: AdminUrls,
        catalog: Catalog,
        request: RequestContext,
    }

    impl Fixture {
        fn new() -> Self {
            let meta = delivery_job();
            let fields = GeometryFieldSet::discover(&meta);
            Self {
                meta,
                fields,
                urls: AdminUrls::default(),
                catalog: Catalog::default(),
                request: RequestContext::default(),
            }
        }

        fn builder<'a>(&'a self, hooks: &'a FeatureHooks) -> FeatureCollectionBuilder<'a> {
            FeatureCollectionBuilder::new(
                &self.meta,
                &self.fields,
                hooks,
                &self.urls,
                &self.catalog,
            )
        }

        fn build(
            &self,
            hooks: &FeatureHooks,
            records: &[Record],
        ) -> Result<FeatureCollection, FeatureError> {
            self.builder(hooks).build(&self.request, records)
        }
    }

    #[test]
    fn one_feature_per_non_null_geometry_field() {
        let fx = Fixture::new();
        let records = vec![
            job(1, None, None),
            job(2, Some((61.0, 61.0)), None),
            job(3, None, Some((71.0, 71.0))),
            job(4, Some((50.01, 50.09)), Some((50.09, 50.01))),
        ];

        let collection = fx.build(&FeatureHooks::default(), &records).unwrap();
        let pairs: Vec<(i64, &str)> = collection
            .features
            .iter()
            .map(|f| (f.properties.pk, f.properties.field.as_str()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                (2, "pickup_point"),
                (3, "dropoff_point"),
                (4, "pickup_point"),
                (4, "dropoff_point"),
            ]
        );
    }

    #[test]
    fn empty_record_collection_yields_empty_feature_list() {
        let fx = Fixture::new();
        let collection = fx.build(&FeatureHooks::default(), &[]).unwrap();
        assert_eq!(
            serde_json::to_value(&collection).unwrap(),
            json!({"type": "FeatureCollection", "features": []})
        );
    }

    #[test]
    fn default_properties_match_expected_json() {
        let fx = Fixture::new();
        let records = vec![job(31, Some((50.04, 50.56)), None)];
        let collection = fx.build(&FeatureHooks::default(), &records).unwrap();

        assert_eq!(
            serde_json::to_value(&collection.features[0]).unwrap(),
            json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [50.04, 50.56]},
                "properties": {
                    "field": "pickup_point",
                    "app_label": "tests",
                    "model_name": "deliveryjob",
                    "pk": 31,
                    "popup": "<div><a title=\"View/Edit Delivery Job\" \
                              href=\"/admin/tests/deliveryjob/31/change/\">\
                              <b><i>Delivery Test 31</i></b></a></div>",
                    "tooltip": "Delivery Test 31: Pickup Point",
                    "line_style": {"color": "#A0A0A0", "fillColor": "#A0A0A0"}
                }
            })
        );
    }

    #[test]
    fn properties_serialize_in_declaration_order() {
        let fx = Fixture::new();
        let hooks =
            FeatureHooks::default().with_icon_style(|_| Ok(Some(json!({"iconUrl": "/pin.png"}))));
        let collection = fx.build(&hooks, &[job(1, Some((1.0, 1.0)), None)]).unwrap();
        let json = collection.to_json().unwrap();

        let order = [
            "\"field\"",
            "\"app_label\"",
            "\"model_name\"",
            "\"pk\"",
            "\"popup\"",
            "\"tooltip\"",
            "\"point_style\"",
            "\"line_style\"",
        ];
        let positions: Vec<usize> = order.iter().map(|key| json.find(key).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert!(json.starts_with(r#"{"type":"FeatureCollection","features":[{"type":"Feature""#));
    }

    #[test]
    fn falsy_hook_results_are_omitted() {
        let fx = Fixture::new();
        let hooks = FeatureHooks::default()
            .with_popup(|_| Ok(None))
            .with_tooltip(|_| Ok(Some(String::new())))
            .with_icon_style(|_| Ok(Some(json!({}))))
            .with_line_style(|_| Ok(Some(Value::Null)));

        let collection = fx.build(&hooks, &[job(1, Some((1.0, 1.0)), None)]).unwrap();
        let props = serde_json::to_value(&collection.features[0].properties).unwrap();
        assert_eq!(
            props,
            json!({
                "field": "pickup_point",
                "app_label": "tests",
                "model_name": "deliveryjob",
                "pk": 1,
            })
        );
    }

    #[test]
    fn icon_style_is_wrapped_in_point_style() {
        let fx = Fixture::new();
        let hooks =
            FeatureHooks::default().with_icon_style(|_| Ok(Some(json!({"iconUrl": "/pin.png"}))));
        let collection = fx.build(&hooks, &[job(1, Some((1.0, 1.0)), None)]).unwrap();
        assert_eq!(
            collection.features[0].properties.point_style,
            Some(PointStyle { icon: json!({"iconUrl": "/pin.png"}) })
        );
    }

    #[test]
    fn hooks_see_field_record_and_collection() {
        let fx = Fixture::new();
        let hooks = FeatureHooks::default().with_line_style(|ctx| {
            let color = if ctx.field == "pickup_point" { "#00FF00" } else { "#FF0000" };
            Ok(Some(json!({
                "color": color,
                "fillColor": color,
                "fillOpacity": 1.0 / ctx.records.len() as f64,
            })))
        });
        let records = vec![job(1, Some((1.0, 1.0)), Some((2.0, 2.0))), job(2, None, None)];
        let collection = fx.build(&hooks, &records).unwrap();

        assert_eq!(
            collection.features[0].properties.line_style,
            Some(json!({"color": "#00FF00", "fillColor": "#00FF00", "fillOpacity": 0.5}))
        );
        assert_eq!(
            collection.features[1].properties.line_style.as_ref().unwrap()["color"],
            "#FF0000"
        );
    }

    #[test]
    fn tooltip_default_uses_verbose_name_hook() {
        let fx = Fixture::new();
        let hooks =
            FeatureHooks::default().with_verbose_name(|ctx| Ok(Some(ctx.field.to_uppercase())));
        let collection = fx.build(&hooks, &[job(5, None, Some((1.0, 1.0)))]).unwrap();
        assert_eq!(
            collection.features[0].properties.tooltip.as_deref(),
            Some("Delivery Test 5: DROPOFF_POINT")
        );
    }

    #[test]
    fn popup_is_translated_and_escaped() {
        let mut fx = Fixture::new();
        fx.catalog = Catalog::new(
            [(
                "View/Edit {model_verbose_name}".to_string(),
                "Voir \"{model_verbose_name}\"".to_string(),
            )]
            .into_iter()
            .collect(),
        );
        let mut record = job(9, Some((1.0, 1.0)), None);
        record.label = "<Fish & Chips>".to_string();

        let collection = fx.build(&FeatureHooks::default(), &[record]).unwrap();
        let popup = collection.features[0].properties.popup.clone().unwrap();
        assert!(popup.contains("title=\"Voir &quot;Delivery Job&quot;\""), "{popup}");
        assert!(popup.contains("<b><i>&lt;Fish &amp; Chips&gt;</i></b>"), "{popup}");
        assert!(popup.contains("href=\"/admin/tests/deliveryjob/9/change/\""), "{popup}");
    }

    #[test]
    fn hook_failure_propagates_by_default() {
        let fx = Fixture::new();
        let hooks = FeatureHooks::default().with_tooltip(|ctx| {
            if ctx.record.pk == 2 {
                Err("tooltip backend unavailable".into())
            } else {
                Ok(None)
            }
        });
        let records = vec![job(1, Some((1.0, 1.0)), None), job(2, Some((2.0, 2.0)), None)];

        let err = fx.build(&hooks, &records).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::Hook { hook: "tooltip", pk: 2, .. }
        ));
    }

    #[test]
    fn skip_policy_omits_only_failing_features() {
        let fx = Fixture::new();
        let hooks = FeatureHooks::default().with_popup(|ctx| {
            if ctx.record.pk == 2 {
                Err("boom".into())
            } else {
                Ok(Some("ok".to_string()))
            }
        });
        let records = vec![
            job(1, Some((1.0, 1.0)), None),
            job(2, Some((2.0, 2.0)), None),
            job(3, Some((3.0, 3.0)), None),
        ];

        let collection = fx
            .builder(&hooks)
            .with_policy(HookFailurePolicy::SkipFeature)
            .build(&fx.request, &records)
            .unwrap();
        let pks: Vec<i64> = collection.features.iter().map(|f| f.properties.pk).collect();
        assert_eq!(pks, vec![1, 3]);
    }

    #[test]
    fn non_geometry_value_in_geometry_field_is_an_error() {
        let fx = Fixture::new();
        let record = Record::new(1, "broken")
            .with_value("pickup_point", FieldValue::Text("50,50".into()));
        assert!(matches!(
            fx.build(&FeatureHooks::default(), &[record]),
            Err(FeatureError::NotAGeometry { pk: 1, .. })
        ));
    }

    #[test]
    fn encodes_polygons_and_collections() {
        let square: Geometry<f64> =
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)].into();
        let encoded = serde_json::to_value(encode_geometry(&square)).unwrap();
        assert_eq!(encoded["type"], "Polygon");
        assert_eq!(encoded["coordinates"][0].as_array().unwrap().len(), 4);

        let collection = Geometry::GeometryCollection(geo::GeometryCollection::new_from(vec![
            Geometry::from(Point::new(1.0, 2.0)),
            square,
        ]));
        let encoded = serde_json::to_value(encode_geometry(&collection)).unwrap();
        assert_eq!(encoded["type"], "GeometryCollection");
        assert_eq!(encoded["geometries"][0], json!({"type": "Point", "coordinates": [1.0, 2.0]}));
    }

    #[test]
    fn truthiness() {
        for falsy in [Value::Null, json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{falsy}");
        }
        for truthy in [json!(true), json!(1), json!("x"), json!([0]), json!({"a": 1})] {
            assert!(is_truthy(&truthy), "{truthy}");
        }
    }
}
