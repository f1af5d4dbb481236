//! Supervisor for the throwaway static file server.
//!
//! The server is spawned over the finished output directory; the supervisor
//! resolves once the process prints its readiness line and extracts the
//! serving origin from it.
//!
//! On unix the server runs in its own process group so that teardown also
//! reaches the processes it spawns (`npx` runs the real server as a child).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use url::Url;

#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::readiness::{wait_for_pattern, ReadinessError};
use crate::{OgError, Result};

/// Placeholder in `args` replaced by the output directory.
pub const ROOT_PLACEHOLDER: &str = "{root}";

/// Matches the startup line of `serve` (both old and new banners).
pub const DEFAULT_READY_PATTERN: &str =
    r"(?:Accepting connections at|Local:)\s+(https?://[^\s│]+)";

/// Default bound on the readiness wait.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Time the process group gets to exit after SIGTERM.
#[cfg(unix)]
const TERM_GRACE: Duration = Duration::from_secs(2);

/// How to launch the static server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerOptions {
    pub command: String,
    pub args: Vec<String>,
    /// Regex whose first capture group is the serving origin.
    pub ready_pattern: String,
    /// Zero disables the bound.
    #[serde(with = "humantime_serde")]
    pub ready_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            command: "npx".to_string(),
            args: vec!["serve".to_string(), ROOT_PLACEHOLDER.to_string()],
            ready_pattern: DEFAULT_READY_PATTERN.to_string(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

impl ServerOptions {
    pub fn ready_deadline(&self) -> Option<Duration> {
        (!self.ready_timeout.is_zero()).then_some(self.ready_timeout)
    }

    pub fn compiled_pattern(&self) -> Result<Regex> {
        let pattern = Regex::new(&self.ready_pattern).map_err(|e| {
            OgError::Config(format!("Invalid server.ready_pattern: {e}"))
        })?;
        if pattern.captures_len() < 2 {
            return Err(OgError::Config(
                "server.ready_pattern needs a capture group for the origin".to_string(),
            ));
        }
        Ok(pattern)
    }

    fn expanded_args(&self, root: &Path) -> Vec<String> {
        let root = root.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(ROOT_PLACEHOLDER, &root))
            .collect()
    }
}

/// A running static server.
#[derive(Debug)]
pub struct PreviewServer {
    child: Child,
    origin: String,
}

impl PreviewServer {
    /// Spawn the server rooted at `root` and wait for its readiness line.
    ///
    /// On any failure the child is killed before returning.
    pub async fn start(options: &ServerOptions, root: &Path) -> Result<Self> {
        let pattern = options.compiled_pattern()?;
        let mut cmd = Command::new(&options.command);
        cmd.args(options.expanded_args(root))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::info!(command = %options.command, root = %root.display(), "starting preview server");
        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &options.command))?;

        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, "server stderr");
        }
        let Some(stdout) = child.stdout.take() else {
            let _ = terminate(&mut child).await;
            return Err(OgError::Server("server stdout was not captured".to_string()));
        };
        let mut reader = BufReader::new(stdout);

        let waited = wait_for_pattern(&mut reader, &pattern, options.ready_deadline()).await;
        let origin = match waited.map_err(readiness_error).and_then(|raw| normalize_origin(&raw)) {
            Ok(origin) => origin,
            Err(err) => {
                if let Err(kill_err) = terminate(&mut child).await {
                    tracing::warn!(error = %kill_err, "could not stop preview server");
                }
                return Err(err);
            }
        };
        forward_lines(reader, "server stdout");

        tracing::info!(%origin, "preview server ready");
        Ok(Self { child, origin })
    }

    /// Serving origin without a trailing slash, e.g. `http://localhost:3000`.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Absolute URL of `route` on this server.
    pub fn url_for(&self, route: &str) -> String {
        if route.starts_with('/') {
            format!("{}{}", self.origin, route)
        } else {
            format!("{}/{}", self.origin, route)
        }
    }

    /// Terminate the server with everything it spawned, and reap it.
    pub async fn shutdown(mut self) -> Result<()> {
        terminate(&mut self.child).await
    }
}

impl Drop for PreviewServer {
    fn drop(&mut self) {
        // `kill_on_drop` only reaches the direct child.
        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                signal_group(pid, Signal::SIGKILL);
            }
        }
    }
}

/// SIGTERM the process group, give it [`TERM_GRACE`] to exit, then SIGKILL
/// whatever is left and reap the direct child.
async fn terminate(child: &mut Child) -> Result<()> {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            signal_group(pid, Signal::SIGTERM);
            if tokio::time::timeout(TERM_GRACE, child.wait()).await.is_err() {
                tracing::warn!(pid, "preview server ignored SIGTERM; killing it");
            }
            // The leader may be gone while its children still hold the port.
            signal_group(pid, Signal::SIGKILL);
        }
    }
    match child.kill().await {
        Ok(()) => Ok(()),
        // Already exited.
        Err(err) if err.kind() == io::ErrorKind::InvalidInput => Ok(()),
        Err(err) => Err(OgError::Io(err)),
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: Signal) {
    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(errno) = killpg(Pid::from_raw(raw), signal) {
        tracing::debug!(pid, ?signal, %errno, "could not signal preview server group");
    }
}

fn forward_lines<R>(stream: R, label: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(stream = label, %line);
        }
    });
}

fn readiness_error(err: ReadinessError) -> OgError {
    match err {
        ReadinessError::Timeout(limit) => OgError::Server(format!(
            "server did not become ready: timed out after {limit:?}"
        )),
        ReadinessError::StreamClosed { pattern } => OgError::Server(format!(
            "server exited before printing a line matching {pattern:?}"
        )),
        ReadinessError::Io(err) => OgError::Io(err),
    }
}

fn normalize_origin(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn map_spawn_error(err: io::Error, command: &str) -> OgError {
    if err.kind() == io::ErrorKind::NotFound {
        OgError::Server(format!(
            "Unable to spawn preview server; '{}' was not found on PATH",
            command
        ))
    } else {
        OgError::Io(err)
    }
}
