//! Pipeline context: owns the job queue for one generation run.
//!
//! The render pass hands every page to [`PipelineContext::process_page`],
//! which extracts the directive, resolves route rules, merges options and
//! queues qualifying pages. Once rendering is complete, a terminal
//! [`BuildEvent`] drains the queue through a [`CaptureWorker`].

use serde::Serialize;
use std::sync::Arc;

use crate::config::{Config, ImageDefaults};
use crate::extract::{extract_directive, should_extract};
use crate::merge::{merge_options, MergeOutcome};
use crate::queue::{JobQueue, QueueEntry};
use crate::routes::RouteRules;
use crate::types::{EffectiveOptions, Provider, RenderedPage};
use crate::worker::{BatchReport, CaptureWorker};
use crate::Result;

/// Terminal build-lifecycle events that may trigger the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEvent {
    BundlingFinished,
    GenerationClosed,
}

/// What the render-pass hook did with one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PageStatus {
    /// Not a document, or the capture service's own route.
    Skipped,
    /// Empty markup; the route is not known to be renderable yet.
    NotRenderable,
    /// No directive and no matching route rule.
    NoImage,
    /// A route rule resolved to `false`.
    Suppressed,
    /// Effective provider is not captured by this pipeline.
    OtherProvider { provider: Provider },
    /// Browser provider, but neither a full pre-render nor `static`.
    NotStatic,
    Queued { order: usize },
}

/// A processed page: its (possibly stripped) render output and status.
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    pub page: Arc<RenderedPage>,
    pub status: PageStatus,
    /// True when the directive element was removed from the markup.
    pub stripped: bool,
}

pub struct PipelineContext {
    rules: RouteRules,
    defaults: ImageDefaults,
    prerender_all: bool,
    queue: JobQueue,
}

impl PipelineContext {
    pub fn new(rules: RouteRules, defaults: ImageDefaults, prerender_all: bool) -> Self {
        Self {
            rules,
            defaults,
            prerender_all,
            queue: JobQueue::new(),
        }
    }

    pub fn from_config(config: &Config, prerender_all: bool) -> Result<Self> {
        Ok(Self::new(
            config.route_rules()?,
            config.defaults.clone(),
            prerender_all,
        ))
    }

    /// Render-pass hook for one page.
    ///
    /// A malformed directive is returned as an error for this page only; the
    /// queue is left untouched.
    pub fn process_page(&mut self, page: RenderedPage) -> Result<ProcessedPage> {
        self.process_page_with(page, |_| Ok(()))
    }

    /// Like [`process_page`](Self::process_page), but hands stripped markup to
    /// `persist` before the page can be queued. A persist error fails the page
    /// and nothing is queued for it.
    pub fn process_page_with<F>(
        &mut self,
        page: RenderedPage,
        persist: F,
    ) -> Result<ProcessedPage>
    where
        F: FnOnce(&RenderedPage) -> Result<()>,
    {
        if !should_extract(&page.route) {
            return Ok(ProcessedPage {
                page: Arc::new(page),
                status: PageStatus::Skipped,
                stripped: false,
            });
        }
        if page.markup.trim().is_empty() {
            return Ok(ProcessedPage {
                page: Arc::new(page),
                status: PageStatus::NotRenderable,
                stripped: false,
            });
        }

        let extraction = extract_directive(&page.route, &page.markup)?;
        let stripped = extraction.directive.is_some();
        let page = Arc::new(RenderedPage {
            markup: extraction.markup,
            ..page
        });
        if stripped {
            persist(&page)?;
        }

        let resolution = self.rules.resolve(&page.route);
        let outcome = merge_options(
            extraction.directive.as_ref(),
            &resolution,
            &self.defaults,
            Arc::clone(&page),
        );
        let status = match outcome {
            MergeOutcome::Suppressed => PageStatus::Suppressed,
            MergeOutcome::NotEligible => PageStatus::NoImage,
            MergeOutcome::Eligible(options) => self.admit(options),
        };
        tracing::debug!(route = %page.route, ?status, "processed page");

        Ok(ProcessedPage {
            page,
            status,
            stripped,
        })
    }

    fn admit(&mut self, options: EffectiveOptions) -> PageStatus {
        if options.provider != Provider::Browser {
            return PageStatus::OtherProvider {
                provider: options.provider,
            };
        }
        if !(self.prerender_all || options.is_static) {
            return PageStatus::NotStatic;
        }
        PageStatus::Queued {
            order: self.queue.enqueue(options),
        }
    }

    pub fn queued(&self) -> &[QueueEntry] {
        self.queue.entries()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Drain the queue in response to a terminal build event.
    ///
    /// Only the first event after a render pass finds work; later events see
    /// an empty queue and return an empty report without any setup.
    pub async fn on_build_event(
        &mut self,
        event: BuildEvent,
        worker: &mut CaptureWorker,
    ) -> BatchReport {
        let entries = self.queue.drain_all();
        if entries.is_empty() {
            tracing::debug!(?event, "no queued preview images");
            return BatchReport::default();
        }
        tracing::info!(?event, jobs = entries.len(), "generating preview images");
        worker.run(entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RuleValue;
    use crate::OgError;

    fn directive(extra: &str) -> String {
        format!(
            r#"<html><head><script id="og-image-options" type="application/json">{{"component":"Blog"{extra}}}</script></head><body></body></html>"#
        )
    }

    fn context(rules: Vec<(&str, RuleValue)>, prerender_all: bool) -> PipelineContext {
        PipelineContext::new(
            RouteRules::new(rules).unwrap(),
            ImageDefaults::default(),
            prerender_all,
        )
    }

    fn page(route: &str, markup: &str) -> RenderedPage {
        let file = format!("{}/index.html", route.trim_matches('/'));
        RenderedPage::new(route, file.trim_start_matches('/'), markup)
    }

    #[test]
    fn queues_directive_pages_in_processing_order() {
        let mut ctx = context(vec![("/private/**", RuleValue::Toggle(false))], true);

        let a = ctx.process_page(page("/zeta", &directive(""))).unwrap();
        let b = ctx.process_page(page("/private/x", "<html></html>")).unwrap();
        let c = ctx.process_page(page("/alpha", &directive(""))).unwrap();

        assert_eq!(a.status, PageStatus::Queued { order: 0 });
        assert_eq!(b.status, PageStatus::Suppressed);
        assert_eq!(c.status, PageStatus::Queued { order: 1 });
        let routes: Vec<&str> = ctx.queued().iter().map(|e| e.options.path.as_str()).collect();
        assert_eq!(routes, vec!["/zeta", "/alpha"]);
    }

    #[test]
    fn suppression_beats_directive() {
        let mut ctx = context(vec![("/blog/**", RuleValue::Toggle(false))], true);
        let out = ctx.process_page(page("/blog/post", &directive(""))).unwrap();
        assert_eq!(out.status, PageStatus::Suppressed);
        assert!(out.stripped);
        assert!(!out.page.markup.contains("og-image-options"));
        assert_eq!(ctx.queue_len(), 0);
    }

    #[test]
    fn plain_pages_are_left_untouched() {
        let mut ctx = context(vec![], true);
        let markup = "<html><body>hi</body></html>";
        let out = ctx.process_page(page("/about", markup)).unwrap();
        assert_eq!(out.status, PageStatus::NoImage);
        assert!(!out.stripped);
        assert_eq!(out.page.markup, markup);
    }

    #[test]
    fn other_providers_are_never_queued() {
        let mut ctx = context(vec![], true);
        let out = ctx
            .process_page(page("/p", &directive(r#","provider":"satori","static":true"#)))
            .unwrap();
        assert_eq!(
            out.status,
            PageStatus::OtherProvider {
                provider: Provider::Satori
            }
        );
        assert_eq!(ctx.queue_len(), 0);
    }

    #[test]
    fn static_flag_required_outside_full_prerender() {
        let mut ctx = context(vec![], false);
        let plain = ctx.process_page(page("/a", &directive(""))).unwrap();
        let fixed = ctx
            .process_page(page("/b", &directive(r#","static":true"#)))
            .unwrap();
        assert_eq!(plain.status, PageStatus::NotStatic);
        assert_eq!(fixed.status, PageStatus::Queued { order: 0 });
    }

    #[test]
    fn skipped_and_empty_pages_do_not_extract() {
        let mut ctx = context(vec![("/**", RuleValue::Toggle(true))], true);
        let asset = ctx.process_page(page("/feed.xml", "{ not html")).unwrap();
        let internal = ctx
            .process_page(page("/__og_image__/html", &directive("")))
            .unwrap();
        let empty = ctx.process_page(page("/later", "")).unwrap();
        assert_eq!(asset.status, PageStatus::Skipped);
        assert_eq!(internal.status, PageStatus::Skipped);
        assert_eq!(empty.status, PageStatus::NotRenderable);
        assert_eq!(ctx.queue_len(), 0);
    }

    #[test]
    fn malformed_directive_fails_only_that_page() {
        let mut ctx = context(vec![], true);
        let bad = r#"<script id="og-image-options">{"component":</script>"#;
        let err = ctx.process_page(page("/bad", bad)).unwrap_err();
        assert!(matches!(err, OgError::Directive { .. }));
        let ok = ctx.process_page(page("/good", &directive(""))).unwrap();
        assert_eq!(ok.status, PageStatus::Queued { order: 0 });
    }

    #[test]
    fn persist_failure_keeps_the_page_out_of_the_queue() {
        let mut ctx = context(vec![], true);
        let err = ctx
            .process_page_with(page("/x", &directive("")), |_| {
                Err(OgError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only output",
                )))
            })
            .unwrap_err();
        assert!(err.to_string().contains("read-only output"));
        assert_eq!(ctx.queue_len(), 0);

        let mut seen = None;
        let ok = ctx
            .process_page_with(page("/y", &directive("")), |stripped| {
                seen = Some(stripped.markup.clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(ok.status, PageStatus::Queued { order: 0 });
        assert!(!seen.unwrap().contains("og-image-options"));
    }

    #[test]
    fn persist_is_skipped_without_a_directive() {
        let mut ctx = context(vec![], true);
        let out = ctx
            .process_page_with(page("/plain", "<html></html>"), |_| {
                panic!("nothing to persist")
            })
            .unwrap();
        assert_eq!(out.status, PageStatus::NoImage);
    }

    #[test]
    fn queued_entry_shares_render_output() {
        let mut ctx = context(vec![], true);
        let out = ctx.process_page(page("/x", &directive(""))).unwrap();
        assert!(Arc::ptr_eq(&out.page, &ctx.queued()[0].options.render_context));
    }
}
