//! Options merging: site defaults < directive < route-rule override.

use std::sync::Arc;

use crate::config::ImageDefaults;
use crate::routes::RuleResolution;
use crate::types::{EffectiveOptions, ImageFragment, RenderedPage};

/// Result of merging one page's configuration layers.
#[derive(Debug, Clone)]
pub enum MergeOutcome {
    Eligible(EffectiveOptions),
    /// A route rule resolved to `false`.
    Suppressed,
    /// Neither a directive nor a matching rule asked for an image.
    NotEligible,
}

/// Merge the layers for one page.
///
/// Suppression short-circuits regardless of the directive. Otherwise rule
/// override fields win over directive fields, which win over `defaults`.
pub fn merge_options(
    directive: Option<&ImageFragment>,
    resolution: &RuleResolution,
    defaults: &ImageDefaults,
    page: Arc<RenderedPage>,
) -> MergeOutcome {
    let layered = match (resolution, directive) {
        (RuleResolution::Suppressed, _) => return MergeOutcome::Suppressed,
        (RuleResolution::Unmatched, None) => return MergeOutcome::NotEligible,
        (RuleResolution::Unmatched, Some(directive)) => directive.clone(),
        (RuleResolution::Override(rule), Some(directive)) => directive.clone().overlay(rule),
        (RuleResolution::Override(rule), None) => rule.clone(),
    };

    MergeOutcome::Eligible(EffectiveOptions {
        path: page.route.clone(),
        component: layered
            .component
            .unwrap_or_else(|| defaults.component.clone()),
        width: layered.width.unwrap_or(defaults.width),
        height: layered.height.unwrap_or(defaults.height),
        provider: layered.provider.unwrap_or(defaults.provider),
        is_static: layered.is_static.unwrap_or(defaults.is_static),
        color_scheme: layered.color_scheme,
        delay: layered.delay,
        selector: layered.selector,
        params: layered.params,
        render_context: page,
    })
}
