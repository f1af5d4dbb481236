//! Capture parameters and per-job outcomes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Preferred color scheme emulated during capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

/// Parameters handed to a browser session for one capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    pub width: u32,
    pub height: u32,
    pub color_scheme: ColorScheme,
    /// Milliseconds to wait after navigation.
    pub delay: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// Outcome of one queued capture.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub route: String,
    /// Output path relative to the output directory.
    pub output_path: PathBuf,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptureResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
