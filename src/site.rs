//! Render pass over a finished output directory.
//!
//! Every `.html` file under the output directory is one rendered page. The
//! pass feeds each page to the pipeline context, writes stripped markup back
//! and records what happened per page.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::pipeline::{PageStatus, PipelineContext};
use crate::types::RenderedPage;
use crate::worker::{IMAGE_DIR, INDEX_FILE};
use crate::{OgError, Result};

/// Per-page record of the render pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub route: String,
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPassSummary {
    pub pages: Vec<PageReport>,
}

impl RenderPassSummary {
    pub fn errors(&self) -> usize {
        self.pages.iter().filter(|p| p.error.is_some()).count()
    }

    pub fn queued(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p.outcome, Some(PageStatus::Queued { .. })))
            .count()
    }
}

/// Route path served for an output file, e.g. `blog/index.html` -> `/blog`.
pub fn route_for(relative: &Path) -> String {
    let mut parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.last().map(String::as_str) == Some(INDEX_FILE) {
        parts.pop();
    }
    format!("/{}", parts.join("/"))
}

/// List the HTML files of the output tree, sorted by path.
///
/// Files inside generated image directories are ignored.
pub fn discover_pages(output_dir: &Path) -> Result<Vec<PathBuf>> {
    if !output_dir.is_dir() {
        return Err(OgError::Config(format!(
            "Output directory not found: {}",
            output_dir.display()
        )));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(output_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != IMAGE_DIR);
    for entry in walker {
        let entry = entry.map_err(|e| OgError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_html = entry
            .path()
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("html"));
        if !is_html {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(output_dir)
            .map_err(|e| OgError::Unknown(e.to_string()))?;
        files.push(relative.to_path_buf());
    }
    Ok(files)
}

/// Run every page of `output_dir` through `ctx`.
///
/// With `write_back`, pages whose directive was stripped are rewritten in
/// place before they are queued; a page that cannot be rewritten is not
/// captured. Per-page failures are recorded and do not stop the pass.
pub fn run_render_pass(
    ctx: &mut PipelineContext,
    output_dir: &Path,
    write_back: bool,
) -> Result<RenderPassSummary> {
    let mut summary = RenderPassSummary::default();
    for relative in discover_pages(output_dir)? {
        let route = route_for(&relative);
        let path = output_dir.join(&relative);
        let outcome = std::fs::read_to_string(&path)
            .map_err(OgError::from)
            .and_then(|markup| {
                ctx.process_page_with(RenderedPage::new(&route, &relative, markup), |page| {
                    if write_back {
                        std::fs::write(&path, page.markup.as_bytes())?;
                    }
                    Ok(())
                })
            })
            .map(|processed| processed.status);

        let report = match outcome {
            Ok(status) => PageReport {
                route,
                file: relative,
                outcome: Some(status),
                error: None,
            },
            Err(err) => {
                tracing::error!(%route, error = %err, "page processing failed");
                PageReport {
                    route,
                    file: relative,
                    outcome: None,
                    error: Some(err.to_string()),
                }
            }
        };
        summary.pages.push(report);
    }
    Ok(summary)
}
