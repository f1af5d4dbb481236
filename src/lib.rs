//! ogshot library
//!
//! Build-time preview image generation for statically rendered sites. Pages
//! opt in through an embedded directive or a route rule; qualifying pages are
//! queued during the render pass and captured in one batch against a local
//! preview server with a single headless browser session.
//!
//! # Module Overview
//!
//! - [`extract`] - Directive extraction from rendered markup
//! - [`routes`] - Route pattern matching and rule cascade
//! - [`merge`] - Effective options from rule, directive and defaults
//! - [`queue`] - Ordered capture job queue
//! - [`pipeline`] - Render-pass hook and build lifecycle trigger
//! - [`server`] - Preview server supervisor
//! - [`browser`] - Headless browser session management
//! - [`worker`] - Capture worker draining the queue
//! - [`site`] - Render pass over a finished output directory
//! - [`config`] - Configuration file support
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use ogshot_lib::{BuildEvent, CaptureWorker, Config, PipelineContext, PlaywrightLauncher};
//!
//! # async fn example() -> ogshot_lib::Result<()> {
//! let config = Config::load(None)?;
//! let mut ctx = PipelineContext::from_config(&config, config.prerender_all)?;
//! ogshot_lib::site::run_render_pass(&mut ctx, Path::new("dist"), true)?;
//!
//! let launcher = Arc::new(PlaywrightLauncher::new(config.browser.clone()));
//! let mut worker = CaptureWorker::new(
//!     "dist",
//!     config.server.clone(),
//!     launcher,
//!     config.capture.clone(),
//!     config.output.dir_policy,
//! );
//! let report = ctx.on_build_event(BuildEvent::GenerationClosed, &mut worker).await;
//! println!("{} images written", report.succeeded());
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod readiness;
pub mod routes;
pub mod server;
pub mod site;
pub mod types;
pub mod worker;

// Browser module re-exports
pub use browser::{
    BrowserManager, BrowserOptions, BrowserSession, ManagedSession, PlaywrightLauncher,
    SessionLauncher, DEFAULT_CAPTURE_TIMEOUT, DEFAULT_LAUNCH_TIMEOUT, DEFAULT_NAVIGATION_TIMEOUT,
};
pub use config::{CaptureDefaults, Config, ImageDefaults};
pub use error::{ErrorCategory, ErrorPayload, OgError, Result};
pub use extract::{extract_directive, should_extract, Extraction};
pub use merge::{merge_options, MergeOutcome};
pub use output::{
    ErrorOutput, GenerateOutput, InspectOutput, OgOutput, PlannedImage, Summary, OUTPUT_VERSION,
};
pub use pipeline::{BuildEvent, PageStatus, PipelineContext, ProcessedPage};
pub use progress::{ProgressCallback, ProgressReporter};
pub use queue::{JobQueue, QueueEntry};
pub use routes::{RoutePattern, RouteRules, RuleResolution, RuleTable, RuleValue};
pub use server::{PreviewServer, ServerOptions};
pub use types::{
    CaptureOptions, CaptureResult, ColorScheme, EffectiveOptions, ImageFragment, Provider,
    RenderedPage,
};
pub use worker::{BatchReport, CaptureWorker, DirPolicy, WorkerState};
