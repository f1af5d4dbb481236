//! Capture worker: drains the job queue against a live server and browser.
//!
//! Setup happens once per batch: the preview server, then the browser
//! session. Entries are captured strictly in queue order; a failing entry is
//! recorded and the drain moves on. The session and the server are released
//! after the drain whatever the outcome.

use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::browser::{BrowserManager, ManagedSession, SessionLauncher};
use crate::config::CaptureDefaults;
use crate::progress::{ProgressCallback, ProgressReporter};
use crate::queue::QueueEntry;
use crate::server::{PreviewServer, ServerOptions};
use crate::types::CaptureResult;
use crate::{OgError, Result};

/// Directory that holds a page's generated image, next to its document.
pub const IMAGE_DIR: &str = "__og_image__";

/// File name of the generated image.
pub const IMAGE_FILE: &str = "og.png";

/// Document file name stripped from render output paths.
pub const INDEX_FILE: &str = "index.html";

/// What to do when the image directory cannot be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DirPolicy {
    /// Fail the job.
    #[default]
    Strict,
    /// Log a warning and attempt the write anyway.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerState {
    Idle,
    ServerStarting,
    BrowserStarting,
    Draining,
    Done,
}

/// Outcome of one drain.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Results in queue order.
    pub results: Vec<CaptureResult>,
    /// Entries skipped because setup failed.
    pub not_attempted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,
}

impl BatchReport {
    fn aborted(not_attempted: usize, err: &OgError) -> Self {
        Self {
            results: Vec::new(),
            not_attempted,
            setup_error: Some(err.to_string()),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// True when setup succeeded (or was unnecessary) and no job failed.
    pub fn is_clean(&self) -> bool {
        self.setup_error.is_none() && self.failed() == 0
    }
}

/// Output path of a page's image, relative to the output directory.
///
/// `blog/post/index.html` maps to `blog/post/__og_image__/og.png`; other
/// documents get a directory named after their stem.
pub fn image_output_path(file_name: &Path) -> PathBuf {
    let parent = file_name.parent().unwrap_or_else(|| Path::new(""));
    let base = match file_name.file_name().and_then(|n| n.to_str()) {
        Some(INDEX_FILE) | None => parent.to_path_buf(),
        Some(_) => match file_name.file_stem() {
            Some(stem) => parent.join(stem),
            None => parent.to_path_buf(),
        },
    };
    base.join(IMAGE_DIR).join(IMAGE_FILE)
}

/// Read the dimensions of captured bytes, failing if they are not an image.
pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = image::io::Reader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}

pub struct CaptureWorker {
    output_dir: PathBuf,
    server: ServerOptions,
    launcher: Arc<dyn SessionLauncher>,
    capture: CaptureDefaults,
    dir_policy: DirPolicy,
    progress: Option<ProgressCallback>,
    colorize: bool,
    state: WorkerState,
}

impl CaptureWorker {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        server: ServerOptions,
        launcher: Arc<dyn SessionLauncher>,
        capture: CaptureDefaults,
        dir_policy: DirPolicy,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            server,
            launcher,
            capture,
            dir_policy,
            progress: None,
            colorize: false,
            state: WorkerState::Idle,
        }
    }

    pub fn with_progress(mut self, sink: ProgressCallback, colorize: bool) -> Self {
        self.progress = Some(sink);
        self.colorize = colorize;
        self
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Capture every entry in order.
    ///
    /// An empty batch performs no setup at all.
    pub async fn run(&mut self, entries: Vec<QueueEntry>) -> BatchReport {
        if entries.is_empty() {
            self.state = WorkerState::Done;
            return BatchReport::default();
        }

        self.state = WorkerState::ServerStarting;
        let server = match PreviewServer::start(&self.server, &self.output_dir).await {
            Ok(server) => server,
            Err(err) => {
                tracing::error!(error = %err, skipped = entries.len(), "preview server failed to start");
                self.state = WorkerState::Done;
                return BatchReport::aborted(entries.len(), &err);
            }
        };

        self.state = WorkerState::BrowserStarting;
        let mut session = match BrowserManager::launch(self.launcher.as_ref()).await {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(error = %err, skipped = entries.len(), "browser failed to launch");
                self.stop_server(server).await;
                self.state = WorkerState::Done;
                return BatchReport::aborted(entries.len(), &err);
            }
        };

        self.state = WorkerState::Draining;
        let mut reporter = self
            .progress
            .clone()
            .map(|sink| ProgressReporter::new(entries.len(), self.colorize, sink));
        if let Some(reporter) = &reporter {
            reporter.header(server.origin());
        }

        let mut results = Vec::with_capacity(entries.len());
        for entry in &entries {
            let result = self.capture_entry(&mut session, &server, entry).await;
            if let Some(reporter) = reporter.as_mut() {
                reporter.report(&result);
            }
            results.push(result);
        }

        session.close().await;
        self.stop_server(server).await;
        self.state = WorkerState::Done;

        let report = BatchReport {
            results,
            not_attempted: 0,
            setup_error: None,
        };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "preview image batch finished"
        );
        report
    }

    async fn stop_server(&self, server: PreviewServer) {
        if let Err(err) = server.shutdown().await {
            tracing::warn!(error = %err, "preview server did not shut down cleanly");
        }
    }

    async fn capture_entry(
        &self,
        session: &mut ManagedSession,
        server: &PreviewServer,
        entry: &QueueEntry,
    ) -> CaptureResult {
        let started = Instant::now();
        let relative = image_output_path(&entry.options.render_context.file_name);
        let outcome = self.try_capture(session, server, entry, &relative).await;
        if let Err(err) = &outcome {
            tracing::warn!(route = %entry.options.path, error = %err, "capture failed");
        }
        CaptureResult {
            route: entry.options.path.clone(),
            output_path: relative,
            elapsed: started.elapsed(),
            error: outcome.err().map(|err| err.to_string()),
        }
    }

    async fn try_capture(
        &self,
        session: &mut ManagedSession,
        server: &PreviewServer,
        entry: &QueueEntry,
        relative: &Path,
    ) -> Result<()> {
        let url = server.url_for(&entry.options.path);
        let options = self.capture.resolve(&entry.options);
        let bytes = session.capture(&url, &options).await?;
        let (width, height) = image_dimensions(&bytes)?;
        tracing::debug!(%url, width, height, bytes = bytes.len(), "captured");

        let target = self.output_dir.join(relative);
        if let Some(parent) = target.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                match self.dir_policy {
                    DirPolicy::Strict => return Err(OgError::Io(err)),
                    DirPolicy::BestEffort => tracing::warn!(
                        dir = %parent.display(),
                        error = %err,
                        "could not create image directory; attempting write anyway"
                    ),
                }
            }
        }
        tokio::fs::write(&target, &bytes).await?;
        Ok(())
    }
}
