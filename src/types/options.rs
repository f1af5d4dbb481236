//! Page-level image configuration types.
//!
//! - [`ImageFragment`] - the shape shared by embedded directives and route-rule overrides
//! - [`Provider`] - rendering strategy selector
//! - [`EffectiveOptions`] - the merged, per-page configuration that drives a capture
//! - [`RenderedPage`] - one page of render output

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

use super::capture::ColorScheme;

/// Rendering strategy for a preview image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Screenshot of the page in a headless browser (the only queued provider)
    #[default]
    Browser,
    /// Direct composition from vector markup; handled outside this pipeline
    Satori,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Browser => write!(f, "browser"),
            Provider::Satori => write!(f, "satori"),
        }
    }
}

/// A partial image configuration.
///
/// Every field is optional so fragments can be layered: an embedded directive,
/// then route-rule overrides, on top of the site defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(default, rename = "static", skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<ColorScheme>,
    /// Milliseconds to wait after navigation before capturing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Free-form visual parameters passed through to the rendered component.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ImageFragment {
    /// Layer `other` on top of `self`: every field `other` defines wins.
    ///
    /// Free-form params are overlaid per key.
    pub fn overlay(mut self, other: &ImageFragment) -> Self {
        if other.component.is_some() {
            self.component = other.component.clone();
        }
        self.width = other.width.or(self.width);
        self.height = other.height.or(self.height);
        self.provider = other.provider.or(self.provider);
        self.is_static = other.is_static.or(self.is_static);
        self.color_scheme = other.color_scheme.or(self.color_scheme);
        self.delay = other.delay.or(self.delay);
        if other.selector.is_some() {
            self.selector = other.selector.clone();
        }
        for (key, value) in &other.params {
            self.params.insert(key.clone(), value.clone());
        }
        self
    }
}

/// One rendered page as produced by the render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Route path, e.g. `/blog/hello`.
    pub route: String,
    /// Output file name relative to the output directory, e.g. `blog/hello/index.html`.
    pub file_name: PathBuf,
    pub markup: String,
}

impl RenderedPage {
    pub fn new(route: impl Into<String>, file_name: impl Into<PathBuf>, markup: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            file_name: file_name.into(),
            markup: markup.into(),
        }
    }
}

/// Fully merged per-page configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveOptions {
    pub path: String,
    pub component: String,
    pub width: u32,
    pub height: u32,
    pub provider: Provider,
    #[serde(rename = "static")]
    pub is_static: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<ColorScheme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    /// Shared handle to the page's render output; never mutated after queuing.
    #[serde(skip)]
    pub render_context: Arc<RenderedPage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fragment_parses_camel_case_and_keeps_unknown_keys() {
        let fragment: ImageFragment = serde_json::from_value(json!({
            "component": "BlogPost",
            "width": 1200,
            "provider": "browser",
            "static": true,
            "colorScheme": "dark",
            "title": "Hello",
            "theme": { "accent": "#f00" }
        }))
        .unwrap();

        assert_eq!(fragment.component.as_deref(), Some("BlogPost"));
        assert_eq!(fragment.width, Some(1200));
        assert_eq!(fragment.height, None);
        assert_eq!(fragment.provider, Some(Provider::Browser));
        assert_eq!(fragment.is_static, Some(true));
        assert_eq!(fragment.color_scheme, Some(ColorScheme::Dark));
        assert_eq!(fragment.params.get("title"), Some(&json!("Hello")));
        assert!(fragment.params.contains_key("theme"));
    }

    #[test]
    fn overlay_prefers_defined_fields_of_the_top_layer() {
        let base = ImageFragment {
            component: Some("Base".into()),
            width: Some(800),
            height: Some(400),
            params: Map::from_iter([("title".to_string(), json!("base")), ("k".to_string(), json!(1))]),
            ..ImageFragment::default()
        };
        let top = ImageFragment {
            width: Some(1200),
            provider: Some(Provider::Satori),
            params: Map::from_iter([("title".to_string(), json!("top"))]),
            ..ImageFragment::default()
        };

        let merged = base.overlay(&top);
        assert_eq!(merged.component.as_deref(), Some("Base"));
        assert_eq!(merged.width, Some(1200));
        assert_eq!(merged.height, Some(400));
        assert_eq!(merged.provider, Some(Provider::Satori));
        assert_eq!(merged.params.get("title"), Some(&json!("top")));
        assert_eq!(merged.params.get("k"), Some(&json!(1)));
    }

    #[test]
    fn provider_rejects_unknown_values() {
        assert!(serde_json::from_value::<Provider>(json!("canvas")).is_err());
        assert_eq!(Provider::Satori.to_string(), "satori");
    }
}
