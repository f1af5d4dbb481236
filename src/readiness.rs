//! Wait for a line matching a pattern on a byte stream.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("ansi pattern is valid"));

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("stream closed before a line matched {pattern:?}")]
    StreamClosed { pattern: String },
    #[error("timed out after {0:?} waiting for readiness line")]
    Timeout(Duration),
    #[error("failed reading stream: {0}")]
    Io(#[from] std::io::Error),
}

/// Read lines from `reader` until one matches `pattern`.
///
/// ANSI escape sequences are removed before matching. Returns capture group 1
/// when the pattern has one, otherwise the whole match. The reader is left
/// positioned after the matching line so the caller can keep draining it.
/// `timeout` of `None` waits until the stream closes.
pub async fn wait_for_pattern<R>(
    reader: &mut R,
    pattern: &Regex,
    timeout: Option<Duration>,
) -> Result<String, ReadinessError>
where
    R: AsyncBufRead + Unpin,
{
    let scan = scan_lines(reader, pattern);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, scan)
            .await
            .map_err(|_| ReadinessError::Timeout(limit))?,
        None => scan.await,
    }
}

async fn scan_lines<R>(reader: &mut R, pattern: &Regex) -> Result<String, ReadinessError>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = Vec::new();
    loop {
        raw.clear();
        let read = reader.read_until(b'\n', &mut raw).await?;
        if read == 0 {
            return Err(ReadinessError::StreamClosed {
                pattern: pattern.as_str().to_string(),
            });
        }
        let line = String::from_utf8_lossy(&raw);
        let line = ANSI_ESCAPE.replace_all(&line, "");
        tracing::debug!(line = %line.trim_end(), "server output");
        if let Some(captures) = pattern.captures(&line) {
            let found = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            return Ok(found);
        }
    }
}
