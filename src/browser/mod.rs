//! Browser automation for page capture.
//!
//! One browser session is launched per batch and reused for every job; each
//! capture runs in its own browser context.
//!
//! # Module Structure
//!
//! - [`manager`] - Session options, launch and guaranteed single close
//! - [`playwright`] - Node helper script, availability checks and error mapping
//! - [`session`] - Session backed by a long-lived Playwright helper process
//!
//! # Example
//!
//! ```no_run
//! use ogshot_lib::{BrowserManager, BrowserOptions, CaptureOptions, ColorScheme, PlaywrightLauncher};
//!
//! # async fn example() -> ogshot_lib::Result<()> {
//! let launcher = PlaywrightLauncher::new(BrowserOptions::default());
//! let mut session = BrowserManager::launch(&launcher).await?;
//! let options = CaptureOptions {
//!     width: 1200,
//!     height: 630,
//!     color_scheme: ColorScheme::Light,
//!     delay: 0,
//!     selector: None,
//! };
//! let png = session.capture("http://localhost:3000/", &options).await?;
//! println!("captured {} bytes", png.len());
//! session.close().await;
//! # Ok(())
//! # }
//! ```

mod manager;
mod playwright;
mod session;

use async_trait::async_trait;

use crate::types::CaptureOptions;
use crate::Result;

pub use manager::{
    BrowserManager, BrowserOptions, ManagedSession, DEFAULT_CAPTURE_TIMEOUT,
    DEFAULT_LAUNCH_TIMEOUT, DEFAULT_NAVIGATION_TIMEOUT,
};
pub use session::{PlaywrightLauncher, PlaywrightSession};

/// A live browser automation session.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url` and return the captured image bytes.
    async fn capture(&mut self, url: &str, options: &CaptureOptions) -> Result<Vec<u8>>;

    /// Release the session. Called once by [`ManagedSession`].
    async fn close(&mut self) -> Result<()>;
}

/// Starts browser sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}
