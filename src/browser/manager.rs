//! Browser session management.
//!
//! [`BrowserManager::launch`] starts the single session used for a batch and
//! wraps it in a [`ManagedSession`], which closes the underlying session
//! exactly once no matter how many times `close` is called.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{BrowserSession, SessionLauncher};
use crate::types::CaptureOptions;
use crate::Result;

/// Default timeout for page navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for starting the browser.
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for a whole capture round trip.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(45);

/// Configuration options for the browser session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserOptions {
    /// The Node.js command to use (default: "node").
    pub node_command: String,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Timeout for launching the browser.
    #[serde(with = "humantime_serde")]
    pub launch_timeout: Duration,
    /// Timeout for page navigation.
    #[serde(with = "humantime_serde")]
    pub navigation_timeout: Duration,
    /// Timeout for one capture request; zero disables it.
    #[serde(with = "humantime_serde")]
    pub capture_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            headless: true,
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
        }
    }
}

impl BrowserOptions {
    pub fn capture_deadline(&self) -> Option<Duration> {
        (!self.capture_timeout.is_zero()).then_some(self.capture_timeout)
    }
}

/// Launches the batch's browser session.
pub struct BrowserManager;

impl BrowserManager {
    pub async fn launch(launcher: &dyn SessionLauncher) -> Result<ManagedSession> {
        tracing::info!("launching browser session");
        let inner = launcher.launch().await?;
        Ok(ManagedSession {
            inner,
            closed: false,
        })
    }
}

/// A session that is closed at most once.
pub struct ManagedSession {
    inner: Box<dyn BrowserSession>,
    closed: bool,
}

impl ManagedSession {
    pub async fn capture(&mut self, url: &str, options: &CaptureOptions) -> Result<Vec<u8>> {
        self.inner.capture(url, options).await
    }

    /// Close the session; later calls are no-ops.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.inner.close().await {
            tracing::warn!(error = %err, "browser session did not close cleanly");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ManagedSession {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("browser session dropped without close; relying on process teardown");
        }
    }
}
