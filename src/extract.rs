//! Directive extraction from rendered markup.
//!
//! A page requests a preview image by embedding a JSON object in a
//! `<script id="og-image-options" type="application/json">` element. The
//! extractor parses the first such element and strips it from the markup so
//! it never reaches visitors of the built site.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ImageFragment;
use crate::{OgError, Result};

/// Element id of the embedded directive.
pub const DIRECTIVE_ID: &str = "og-image-options";

/// Route prefix served by the capture service itself.
pub const INTERNAL_ROUTE_PREFIX: &str = "/__og_image__";

static DIRECTIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<script\b[^>]*\bid=["']og-image-options["'][^>]*>(.*?)</script>"#)
        .expect("directive pattern is valid")
});

/// Result of scanning one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub directive: Option<ImageFragment>,
    /// Markup with the directive element removed (unchanged when none was found).
    pub markup: String,
}

/// Whether a route should be scanned for a directive at all.
///
/// Non-document routes (last segment has a file extension) and the capture
/// service's own routes are skipped.
pub fn should_extract(route: &str) -> bool {
    let path = route.split(['?', '#']).next().unwrap_or_default();
    if path == INTERNAL_ROUTE_PREFIX || path.starts_with(&format!("{INTERNAL_ROUTE_PREFIX}/")) {
        return false;
    }
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    !last.contains('.')
}

/// Parse and strip the directive from `markup`.
///
/// Empty markup yields no directive; the page simply is not known to be
/// renderable yet. A malformed payload is an error for this page only.
pub fn extract_directive(route: &str, markup: &str) -> Result<Extraction> {
    if markup.trim().is_empty() {
        return Ok(Extraction {
            directive: None,
            markup: markup.to_string(),
        });
    }

    let Some(captures) = DIRECTIVE_RE.captures(markup) else {
        return Ok(Extraction {
            directive: None,
            markup: markup.to_string(),
        });
    };

    let (Some(element), Some(payload)) = (captures.get(0), captures.get(1)) else {
        return Err(OgError::directive(route, "directive element has no payload"));
    };

    let value: serde_json::Value = serde_json::from_str(payload.as_str().trim())
        .map_err(|e| OgError::directive(route, e.to_string()))?;
    if !value.is_object() {
        return Err(OgError::directive(
            route,
            format!("expected a JSON object, found {}", json_kind(&value)),
        ));
    }
    let directive: ImageFragment =
        serde_json::from_value(value).map_err(|e| OgError::directive(route, e.to_string()))?;

    let mut stripped = String::with_capacity(markup.len() - element.len());
    stripped.push_str(&markup[..element.start()]);
    stripped.push_str(&markup[element.end()..]);

    Ok(Extraction {
        directive: Some(directive),
        markup: stripped,
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
