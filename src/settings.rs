use std::path::Path;
use std::time::Duration;

use ogshot_lib::{Config, OgError};

/// Resolved settings after merging CLI args and config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub prerender_all: bool,
    pub ready_timeout: Duration,
}

/// Merge CLI arguments with config file, preferring CLI when flags are present.
///
/// `--all` can only switch full pre-render on; without it the config decides.
pub fn resolve_settings(
    cli_all: bool,
    cli_ready_timeout: Option<u64>,
    config: &Config,
) -> ResolvedSettings {
    ResolvedSettings {
        prerender_all: cli_all || config.prerender_all,
        ready_timeout: cli_ready_timeout
            .map(Duration::from_secs)
            .unwrap_or(config.server.ready_timeout),
    }
}

/// Apply resolved settings to the config used for the run.
pub fn apply_settings(config: &mut Config, resolved: &ResolvedSettings) {
    config.prerender_all = resolved.prerender_all;
    config.server.ready_timeout = resolved.ready_timeout;
}

/// Load config from a TOML file, `ogshot.toml` in the working directory, or
/// return defaults; then validate it.
pub fn load_config(path: Option<&Path>) -> Result<Config, OgError> {
    let cfg = Config::load(path)?;
    cfg.validate().map_err(|err| {
        let e = match err {
            OgError::Config(msg) => msg,
            other => other.to_string(),
        };
        let prefix = Config::resolve_path(path)
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        OgError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Log effective config (visible with `--verbose`).
pub fn log_effective_config(config_path: Option<&Path>, config: &Config) {
    let source = Config::resolve_path(config_path);
    tracing::debug!("{}", format_effective_config(config, source.as_deref()));
}

/// Format effective config as a single-line string.
pub fn format_effective_config(config: &Config, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective config [{source}]: prerender_all={}, defaults: component={}, size={}x{}, provider={}, static={}, server: command={} {}, ready_timeout={}s, browser: headless={}, navigation={}s, capture={}s, dir_policy={:?}, route_rules={}",
        config.prerender_all,
        config.defaults.component,
        config.defaults.width,
        config.defaults.height,
        config.defaults.provider,
        config.defaults.is_static,
        config.server.command,
        config.server.args.join(" "),
        config.server.ready_timeout.as_secs(),
        config.browser.headless,
        config.browser.navigation_timeout.as_secs(),
        config.browser.capture_timeout.as_secs(),
        config.output.dir_policy,
        config.route_rules.len(),
    )
}
