//! Per-record-type popup, tooltip and style hooks.
//!
//! Every hook is optional. An unset hook falls back to the default
//! implementation documented on the matching `default_*` function. Hooks
//! see the whole [`HookContext`], so a deployment can make styling depend
//! on the request path or the active filters even though the defaults do
//! not.

use std::fmt;
use std::sync::Arc;

use map_admin_models::{Catalog, ModelMeta, Record, RequestContext};
use serde_json::{Value, json};

use crate::html::escape;
use crate::urls::AdminUrls;

/// Error returned by a failing hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// `Ok(None)` means "no value"; the property is then left out.
pub type HookResult<T> = Result<Option<T>, HookError>;

/// Hook producing a string property (popup HTML, tooltip, verbose name).
pub type TextHook = Arc<dyn Fn(&HookContext<'_>) -> HookResult<String> + Send + Sync>;

/// Hook producing a JSON style object.
pub type StyleHook = Arc<dyn Fn(&HookContext<'_>) -> HookResult<Value> + Send + Sync>;

/// Everything a hook may look at while one Feature is being built.
pub struct HookContext<'a> {
    /// The request being served.
    pub request: &'a RequestContext,
    /// Schema of the record type.
    pub meta: &'a ModelMeta,
    /// Geometry field the Feature is built for.
    pub field: &'a str,
    /// The record the Feature is built for.
    pub record: &'a Record,
    /// The whole record collection being rendered.
    pub records: &'a [Record],
    /// Admin URL resolver.
    pub urls: &'a AdminUrls,
    /// Message catalog.
    pub catalog: &'a Catalog,
    /// The hook set in effect, for hooks that build on each other.
    pub hooks: &'a FeatureHooks,
}

/// Overridable hooks for one record type.
#[derive(Clone, Default)]
pub struct FeatureHooks {
    /// Popup HTML. See [`default_popup`].
    pub popup: Option<TextHook>,
    /// Tooltip text. See [`default_tooltip`].
    pub tooltip: Option<TextHook>,
    /// Point icon style, wrapped as `{"icon": ...}`. Unset by default.
    pub icon_style: Option<StyleHook>,
    /// Line and fill style. See [`default_line_style`].
    pub line_style: Option<StyleHook>,
    /// Verbose name of the geometry field. See [`default_verbose_name`].
    pub verbose_name: Option<TextHook>,
}

impl fmt::Debug for FeatureHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureHooks")
            .field("popup", &self.popup.is_some())
            .field("tooltip", &self.tooltip.is_some())
            .field("icon_style", &self.icon_style.is_some())
            .field("line_style", &self.line_style.is_some())
            .field("verbose_name", &self.verbose_name.is_some())
            .finish()
    }
}

impl FeatureHooks {
    /// Overrides the popup hook.
    #[must_use]
    pub fn with_popup(
        mut self,
        hook: impl Fn(&HookContext<'_>) -> HookResult<String> + Send + Sync + 'static,
    ) -> Self {
        self.popup = Some(Arc::new(hook));
        self
    }

    /// Overrides the tooltip hook.
    #[must_use]
    pub fn with_tooltip(
        mut self,
        hook: impl Fn(&HookContext<'_>) -> HookResult<String> + Send + Sync + 'static,
    ) -> Self {
        self.tooltip = Some(Arc::new(hook));
        self
    }

    /// Overrides the icon style hook.
    #[must_use]
    pub fn with_icon_style(
        mut self,
        hook: impl Fn(&HookContext<'_>) -> HookResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.icon_style = Some(Arc::new(hook));
        self
    }

    /// Overrides the line style hook.
    #[must_use]
    pub fn with_line_style(
        mut self,
        hook: impl Fn(&HookContext<'_>) -> HookResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.line_style = Some(Arc::new(hook));
        self
    }

    /// Overrides the field verbose name hook.
    #[must_use]
    pub fn with_verbose_name(
        mut self,
        hook: impl Fn(&HookContext<'_>) -> HookResult<String> + Send + Sync + 'static,
    ) -> Self {
        self.verbose_name = Some(Arc::new(hook));
        self
    }

    /// Runs the popup hook or its default.
    ///
    /// # Errors
    ///
    /// Propagates the hook's error.
    pub fn popup(&self, ctx: &HookContext<'_>) -> HookResult<String> {
        self.popup.as_ref().map_or_else(|| default_popup(ctx), |hook| hook(ctx))
    }

    /// Runs the tooltip hook or its default.
    ///
    /// # Errors
    ///
    /// Propagates the hook's error.
    pub fn tooltip(&self, ctx: &HookContext<'_>) -> HookResult<String> {
        self.tooltip
            .as_ref()
            .map_or_else(|| default_tooltip(ctx), |hook| hook(ctx))
    }

    /// Runs the icon style hook. There is no default icon.
    ///
    /// # Errors
    ///
    /// Propagates the hook's error.
    pub fn icon_style(&self, ctx: &HookContext<'_>) -> HookResult<Value> {
        self.icon_style.as_ref().map_or(Ok(None), |hook| hook(ctx))
    }

    /// Runs the line style hook or its default.
    ///
    /// # Errors
    ///
    /// Propagates the hook's error.
    pub fn line_style(&self, ctx: &HookContext<'_>) -> HookResult<Value> {
        self.line_style
            .as_ref()
            .map_or_else(|| default_line_style(ctx), |hook| hook(ctx))
    }

    /// Runs the verbose name hook or its default.
    ///
    /// # Errors
    ///
    /// Propagates the hook's error.
    pub fn verbose_name(&self, ctx: &HookContext<'_>) -> HookResult<String> {
        self.verbose_name
            .as_ref()
            .map_or_else(|| default_verbose_name(ctx), |hook| hook(ctx))
    }
}

/// `<div><a title="View/Edit {type}" href="{change url}"><b><i>{record}</i></b></a></div>`
///
/// The title is looked up in the message catalog. Title and record label
/// are HTML-escaped.
///
/// # Errors
///
/// Never fails; the signature matches [`TextHook`].
pub fn default_popup(ctx: &HookContext<'_>) -> HookResult<String> {
    let verbose_name = ctx.meta.verbose_name();
    let title = ctx.catalog.format(
        "View/Edit {model_verbose_name}",
        &[("model_verbose_name", verbose_name.as_str())],
    );
    let link = ctx.urls.change(ctx.meta, ctx.record.pk);

    Ok(Some(format!(
        "<div><a title=\"{}\" href=\"{}\"><b><i>{}</i></b></a></div>",
        escape(&title),
        escape(&link),
        escape(&ctx.record.label),
    )))
}

/// `"{record}: {field verbose name}"`, with the verbose name taken from
/// the context's verbose name hook.
///
/// # Errors
///
/// Propagates an error from the verbose name hook.
pub fn default_tooltip(ctx: &HookContext<'_>) -> HookResult<String> {
    let verbose_name = ctx.hooks.verbose_name(ctx)?.unwrap_or_default();
    Ok(Some(format!("{}: {verbose_name}", ctx.record.label)))
}

/// `{"color": "#A0A0A0", "fillColor": "#A0A0A0"}`
///
/// # Errors
///
/// Never fails; the signature matches [`StyleHook`].
pub fn default_line_style(_ctx: &HookContext<'_>) -> HookResult<Value> {
    Ok(Some(json!({
        "color": "#A0A0A0",
        "fillColor": "#A0A0A0",
    })))
}

/// The schema's verbose name for the field, translated.
///
/// # Errors
///
/// Never fails; the signature matches [`TextHook`].
pub fn default_verbose_name(ctx: &HookContext<'_>) -> HookResult<String> {
    let name = ctx
        .meta
        .field(ctx.field)
        .map_or_else(|| ctx.field.replace('_', " "), |f| f.verbose_name());
    Ok(Some(ctx.catalog.gettext(&name).to_string()))
}
