//! Browser session backed by a long-lived Playwright helper process.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::manager::BrowserOptions;
use super::playwright::{
    ensure_node_available, ensure_playwright_available, map_capture_error, map_launch_error,
    map_spawn_error, CaptureRequest, HelperResponse, HELPER_SCRIPT,
};
use super::{BrowserSession, SessionLauncher};
use crate::readiness::{wait_for_pattern, ReadinessError};
use crate::types::CaptureOptions;
use crate::{OgError, Result};

static STATUS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(\{.*"status"\s*:\s*"(?:ready|error)".*\})\s*$"#)
        .expect("status line pattern is valid")
});

const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Launches [`PlaywrightSession`]s.
#[derive(Debug, Clone)]
pub struct PlaywrightLauncher {
    options: BrowserOptions,
}

impl PlaywrightLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }
}

#[async_trait]
impl SessionLauncher for PlaywrightLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        Ok(Box::new(PlaywrightSession::launch(&self.options).await?))
    }
}

/// One Chromium instance driven over JSON lines.
#[derive(Debug)]
pub struct PlaywrightSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    capture_timeout: Option<Duration>,
}

impl PlaywrightSession {
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        // Fail fast if Node is missing to avoid spawning the helper unnecessarily.
        ensure_node_available(&options.node_command).await?;
        ensure_playwright_available(&options.node_command).await?;

        let mut cmd = Command::new(&options.node_command);
        cmd.arg("-e")
            .arg(HELPER_SCRIPT)
            .arg(if options.headless { "1" } else { "0" })
            .arg(options.navigation_timeout.as_millis().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &options.node_command))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(stream = "browser stderr", %line);
                }
            });
        }

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill().await;
            return Err(OgError::Browser("browser helper pipes were not captured".to_string()));
        };
        let mut reader = BufReader::new(stdout);

        let launch_deadline = (!options.launch_timeout.is_zero()).then_some(options.launch_timeout);
        let status = match wait_for_pattern(&mut reader, &STATUS_LINE, launch_deadline).await {
            Ok(line) => serde_json::from_str::<HelperResponse>(&line).map_err(OgError::from),
            Err(ReadinessError::Timeout(limit)) => Err(OgError::Browser(format!(
                "browser did not start within {limit:?}"
            ))),
            Err(ReadinessError::StreamClosed { .. }) => Err(OgError::Browser(
                "browser helper exited before reporting ready".to_string(),
            )),
            Err(ReadinessError::Io(err)) => Err(OgError::Io(err)),
        };
        let status = match status {
            Ok(status) if status.status == "ready" => status,
            Ok(status) => {
                let _ = child.kill().await;
                return Err(map_launch_error(status.message.as_deref().unwrap_or("unknown error")));
            }
            Err(err) => {
                let _ = child.kill().await;
                return Err(err);
            }
        };
        tracing::debug!(status = %status.status, "browser helper ready");

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: reader.lines(),
            next_id: 0,
            capture_timeout: options.capture_deadline(),
        })
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| OgError::Browser("browser session is closed".to_string()))?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self, id: u64) -> Result<Vec<u8>> {
        loop {
            let Some(line) = self.stdout.next_line().await? else {
                return Err(OgError::Browser("browser helper exited".to_string()));
            };
            let response = match serde_json::from_str::<HelperResponse>(&line) {
                Ok(response) => response,
                Err(_) => {
                    tracing::debug!(stream = "browser stdout", %line);
                    continue;
                }
            };
            if response.id != Some(id) {
                tracing::debug!(expected = id, got = ?response.id, "discarding stale helper response");
                continue;
            }
            if response.status != "ok" {
                return Err(map_capture_error(response.message));
            }
            let data = response
                .data
                .ok_or_else(|| OgError::capture("helper returned ok status but no image data"))?;
            return BASE64_STANDARD
                .decode(data.as_bytes())
                .map_err(|e| OgError::capture(format!("invalid image payload: {e}")));
        }
    }
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn capture(&mut self, url: &str, options: &CaptureOptions) -> Result<Vec<u8>> {
        self.next_id += 1;
        let id = self.next_id;
        let request = CaptureRequest {
            id,
            url,
            width: options.width,
            height: options.height,
            color_scheme: options.color_scheme,
            delay: options.delay,
            selector: options.selector.as_deref(),
        };
        let line = serde_json::to_string(&request)?;
        self.send_line(&line).await?;

        match self.capture_timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_response(id))
                .await
                .map_err(|_| OgError::capture(format!("Timeout: no capture result within {limit:?}")))?,
            None => self.read_response(id).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.stdin.is_some() {
            if let Err(err) = self.send_line(r#"{"type":"close"}"#).await {
                tracing::debug!(error = %err, "could not send close request");
            }
        }
        // Dropping stdin signals EOF to the helper.
        self.stdin = None;

        match tokio::time::timeout(CLOSE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(%status, "browser helper exited");
                Ok(())
            }
            Ok(Err(err)) => Err(OgError::Io(err)),
            Err(_) => {
                tracing::warn!("browser helper did not exit in time; killing it");
                self.child.kill().await.map_err(OgError::Io)
            }
        }
    }
}
