use serde::Serialize;
use std::path::PathBuf;

use crate::error::ErrorPayload;
use crate::queue::QueueEntry;
use crate::site::{PageReport, RenderPassSummary};
use crate::types::EffectiveOptions;
use crate::worker::{image_output_path, BatchReport};

/// Schema version for output payloads.
pub const OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum OgOutput {
    Generate(GenerateOutput),
    Inspect(InspectOutput),
    Error(ErrorOutput),
}

/// Counters over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub pages: usize,
    pub page_errors: usize,
    pub queued: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub not_attempted: usize,
}

impl Summary {
    pub fn new(pass: &RenderPassSummary, report: Option<&BatchReport>) -> Self {
        Self {
            pages: pass.pages.len(),
            page_errors: pass.errors(),
            queued: pass.queued(),
            succeeded: report.map_or(0, BatchReport::succeeded),
            failed: report.map_or(0, BatchReport::failed),
            not_attempted: report.map_or(0, |r| r.not_attempted),
        }
    }

    /// True when no page and no job failed.
    pub fn is_clean(&self) -> bool {
        self.page_errors == 0 && self.failed == 0 && self.not_attempted == 0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutput {
    pub version: String,
    pub output_dir: PathBuf,
    pub prerender_all: bool,
    pub summary: Summary,
    pub pages: Vec<PageReport>,
    pub report: BatchReport,
}

impl GenerateOutput {
    pub fn succeeded(&self) -> bool {
        self.summary.is_clean() && self.report.setup_error.is_none()
    }
}

/// A queued image as it would be captured.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedImage {
    pub order: usize,
    pub route: String,
    pub output_path: PathBuf,
    pub options: EffectiveOptions,
}

impl From<&QueueEntry> for PlannedImage {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            order: entry.order,
            route: entry.options.path.clone(),
            output_path: image_output_path(&entry.options.render_context.file_name),
            options: entry.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectOutput {
    pub version: String,
    pub output_dir: PathBuf,
    pub prerender_all: bool,
    pub summary: Summary,
    pub pages: Vec<PageReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<PlannedImage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}
