//! Playwright integration for the capture session.
//!
//! This module contains the long-lived Node helper script, the JSON-lines
//! protocol types, error mapping, and availability checks for Node.js and
//! Playwright.

use crate::{OgError, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Helper that launches Chromium once and serves capture requests from stdin.
///
/// argv: headless flag ("1"/"0"), navigation timeout in ms.
pub(crate) const HELPER_SCRIPT: &str = r#"
const readline = require('readline');
const [, headlessFlag, navTimeout] = process.argv;

function send(msg) {
  process.stdout.write(JSON.stringify(msg) + '\n');
}

function describe(err) {
  return err && err.message ? err.message : String(err);
}

async function run() {
  let browser;
  try {
    const { chromium } = require('playwright');
    browser = await chromium.launch({ headless: headlessFlag !== '0' });
  } catch (err) {
    send({ status: 'error', message: describe(err) });
    process.exitCode = 1;
    return;
  }
  send({ status: 'ready' });

  const rl = readline.createInterface({ input: process.stdin, terminal: false });
  for await (const line of rl) {
    if (!line.trim()) continue;
    let req;
    try {
      req = JSON.parse(line);
    } catch (err) {
      send({ status: 'error', message: 'invalid request: ' + describe(err) });
      continue;
    }
    if (req.type === 'close') break;

    let context;
    try {
      context = await browser.newContext({
        viewport: { width: req.width, height: req.height },
        colorScheme: req.colorScheme
      });
      const page = await context.newPage();
      await page.goto(req.url, { waitUntil: 'networkidle', timeout: parseInt(navTimeout, 10) });
      if (req.delay > 0) {
        await page.waitForTimeout(req.delay);
      }
      const target = req.selector ? page.locator(req.selector).first() : page;
      const buffer = await target.screenshot({ type: 'png' });
      send({ id: req.id, status: 'ok', data: buffer.toString('base64') });
    } catch (err) {
      send({ id: req.id, status: 'error', message: describe(err) });
    } finally {
      if (context) {
        await context.close().catch(() => {});
      }
    }
  }

  await browser.close();
}

run();
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Script to check if Playwright is installed.
const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Request line sent to the helper.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptureRequest<'a> {
    pub id: u64,
    pub url: &'a str,
    pub width: u32,
    pub height: u32,
    pub color_scheme: crate::types::ColorScheme,
    pub delay: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<&'a str>,
}

/// Response line from the helper.
#[derive(Debug, Deserialize)]
pub(crate) struct HelperResponse {
    #[serde(default)]
    pub id: Option<u64>,
    pub status: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Maps a spawn error to an appropriate OgError.
pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> OgError {
    if err.kind() == io::ErrorKind::NotFound {
        OgError::Browser(format!(
            "Unable to spawn browser helper; '{}' was not found on PATH",
            command
        ))
    } else {
        OgError::Io(err)
    }
}

/// Maps a helper launch failure message to an appropriate OgError.
pub(crate) fn map_launch_error(message: &str) -> OgError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        OgError::Browser(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        )
    } else if lower.contains("executable doesn't exist") {
        OgError::Browser(format!(
            "Chromium executable doesn't exist; run `npx playwright install chromium`. ({})",
            message.lines().next().unwrap_or_default().trim()
        ))
    } else {
        OgError::Browser(format!("Browser launch failed: {}", message.trim()))
    }
}

/// Maps a per-capture helper error to an appropriate OgError.
pub(crate) fn map_capture_error(message: Option<String>) -> OgError {
    let message = message.unwrap_or_else(|| "no additional details".to_string());
    if message.to_ascii_lowercase().contains("timeout") {
        OgError::capture(format!(
            "{}. Hint: increase browser.navigation_timeout, and ensure the page finishes loading.",
            message.trim()
        ))
    } else {
        OgError::capture(message.trim().to_string())
    }
}

/// Ensures Node.js is available on the system.
pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            OgError::Browser(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(OgError::Browser(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

/// Ensures Playwright npm package is installed.
pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            OgError::Browser(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_launch_error(&stderr));
    }

    Ok(())
}
