use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum OgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed og-image directive on {route}: {message}")]
    Directive { route: String, message: String },

    #[error("Invalid route pattern '{pattern}': {reason}")]
    RoutePattern { pattern: String, reason: String },

    #[error("Preview server error: {0}")]
    Server(String),

    #[error("Browser session error: {0}")]
    Browser(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl OgError {
    pub fn directive(route: impl Into<String>, message: impl Into<String>) -> Self {
        OgError::Directive {
            route: route.into(),
            message: message.into(),
        }
    }

    pub fn route_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        OgError::RoutePattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    pub fn capture(message: impl Into<String>) -> Self {
        OgError::Capture(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            OgError::Io(e) => ErrorPayload::new(
                ErrorCategory::Io,
                e.to_string(),
                "Check the output directory path and its permissions.",
            ),
            OgError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Server,
                e.to_string(),
                "Check that server.ready_pattern captures a full origin (e.g., http://localhost:3000).",
            ),
            OgError::Image(e) => ErrorPayload::new(
                ErrorCategory::Capture,
                e.to_string(),
                "The capture returned bytes that are not an image; rerun with --verbose to see helper output.",
            ),
            OgError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON inputs; run with --verbose for details.",
            ),
            OgError::Directive { .. } => ErrorPayload::new(
                ErrorCategory::Directive,
                self.to_string(),
                "The og-image-options script must contain a JSON object; check the component that embeds it.",
            ),
            OgError::RoutePattern { .. } => ErrorPayload::new(
                ErrorCategory::Config,
                self.to_string(),
                "Route patterns are '/'-separated; '**' is only allowed as the last segment.",
            ),
            OgError::Server(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("timed out") {
                    ErrorPayload::new(
                        ErrorCategory::Server,
                        msg.to_string(),
                        "Increase --ready-timeout or check that server.ready_pattern matches the server's startup line.",
                    )
                } else if lower.contains("not found on path") {
                    ErrorPayload::new(
                        ErrorCategory::Server,
                        msg.to_string(),
                        "Install the static server (e.g., `npm install -g serve`) or set server.command.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Server,
                        msg.to_string(),
                        "Check server.command/server.args; the server must print a readiness line.",
                    )
                }
            }
            OgError::Browser(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("playwright npm package is missing") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`).",
                    )
                } else if lower.contains("executable doesn't exist")
                    || lower.contains("chromium executable")
                {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Run `npx playwright install chromium` to download the browser.",
                    )
                } else if lower.contains("not found on path") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Node.js and ensure the node binary is on PATH (or set browser.node_command).",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Re-run with --verbose to see the browser helper output.",
                    )
                }
            }
            OgError::Capture(msg) => {
                if msg.to_ascii_lowercase().contains("timeout") {
                    ErrorPayload::new(
                        ErrorCategory::Capture,
                        msg.to_string(),
                        "Increase browser.navigation_timeout/browser.capture_timeout, and ensure the page finishes loading.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Capture,
                        msg.to_string(),
                        "Open the page in a browser to check that it renders.",
                    )
                }
            }
            OgError::Config(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check flags, the config file (ogshot.toml) and the output directory.",
            ),
            OgError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, OgError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Io,
    Directive,
    Server,
    Browser,
    Capture,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
