use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::browser::BrowserOptions;
use crate::routes::{RouteRules, RuleTable, RuleValue};
use crate::server::ServerOptions;
use crate::types::{CaptureOptions, ColorScheme, EffectiveOptions, Provider};
use crate::worker::DirPolicy;
use crate::{OgError, Result};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "ogshot.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Treat the run as a full pre-render: queue every eligible browser page,
    /// not only those marked `static`.
    pub prerender_all: bool,
    pub defaults: ImageDefaults,
    pub capture: CaptureDefaults,
    pub server: ServerOptions,
    pub browser: BrowserOptions,
    pub output: OutputOptions,
    /// Kept in file order; order breaks specificity ties.
    pub route_rules: RuleTable,
}

/// Site-wide fallbacks for every image field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageDefaults {
    pub component: String,
    pub width: u32,
    pub height: u32,
    pub provider: Provider,
    #[serde(rename = "static")]
    pub is_static: bool,
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            component: "Fallback".to_string(),
            width: 1200,
            height: 630,
            provider: Provider::Browser,
            is_static: false,
        }
    }
}

/// Site-wide capture parameters; entry options override them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureDefaults {
    pub color_scheme: ColorScheme,
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    pub selector: Option<String>,
}

impl CaptureDefaults {
    pub fn resolve(&self, options: &EffectiveOptions) -> CaptureOptions {
        CaptureOptions {
            width: options.width,
            height: options.height,
            color_scheme: options.color_scheme.unwrap_or(self.color_scheme),
            delay: options.delay.unwrap_or_else(|| {
                u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX)
            }),
            selector: options.selector.clone().or_else(|| self.selector.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputOptions {
    pub dir_policy: DirPolicy,
}

impl Config {
    /// Resolve which file to read: explicit path, then `ogshot.toml` in the
    /// working directory.
    pub fn resolve_path(path: Option<&Path>) -> Option<PathBuf> {
        match path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.is_file().then_some(local)
            }
        }
    }

    /// Load config from a TOML file, the working-directory default, or built-ins.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::resolve_path(path) else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            OgError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
            .map_err(|e| OgError::Config(format!("Invalid config ({}): {}", path.display(), e)))
    }

    pub fn from_toml(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.defaults.width == 0 || self.defaults.height == 0 {
            return Err(OgError::Config(
                "defaults.width and defaults.height must be positive".to_string(),
            ));
        }
        if self.defaults.component.trim().is_empty() {
            return Err(OgError::Config("defaults.component must not be empty".to_string()));
        }
        if self.server.command.trim().is_empty() {
            return Err(OgError::Config("server.command must not be empty".to_string()));
        }
        self.server.compiled_pattern()?;
        for (pattern, value) in self.route_rules.iter() {
            if let RuleValue::Override(fragment) = value {
                if fragment.width == Some(0) || fragment.height == Some(0) {
                    return Err(OgError::Config(format!(
                        "route_rules.\"{pattern}\": width and height must be positive"
                    )));
                }
            }
        }
        self.route_rules()?;
        Ok(())
    }

    pub fn route_rules(&self) -> Result<RouteRules> {
        RouteRules::new(
            self.route_rules
                .iter()
                .map(|(pattern, value)| (pattern, value.clone())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RuleResolution;
    use crate::types::{ImageFragment, RenderedPage};
    use std::sync::Arc;

    #[test]
    fn default_values_match_expected() {
        let cfg = Config::default();

        assert!(!cfg.prerender_all);
        assert_eq!(cfg.defaults.width, 1200);
        assert_eq!(cfg.defaults.height, 630);
        assert_eq!(cfg.defaults.provider, Provider::Browser);
        assert_eq!(cfg.server.command, "npx");
        assert_eq!(cfg.server.ready_timeout, Duration::from_secs(30));
        assert_eq!(cfg.output.dir_policy, DirPolicy::Strict);
        assert!(cfg.route_rules.is_empty());
        cfg.validate().unwrap();
    }

    #[test]
    fn parses_full_config() {
        let cfg = Config::from_toml(
            r#"
prerender_all = true

[defaults]
component = "Brand"
width = 1000
static = true

[capture]
color_scheme = "dark"
delay = "250ms"

[server]
command = "python3"
args = ["-m", "http.server", "--directory", "{root}"]
ready_pattern = 'Serving HTTP on \S+ port (\d+)'
ready_timeout = "0s"

[browser]
navigation_timeout = "10s"
headless = false

[output]
dir_policy = "best-effort"

[route_rules]
"/admin/**" = false
"/blog/**" = { component = "BlogPost", title = "Blog" }
"#,
        )
        .unwrap();

        assert!(cfg.prerender_all);
        assert_eq!(cfg.defaults.component, "Brand");
        assert_eq!(cfg.defaults.width, 1000);
        assert_eq!(cfg.defaults.height, 630);
        assert!(cfg.defaults.is_static);
        assert_eq!(cfg.capture.color_scheme, ColorScheme::Dark);
        assert_eq!(cfg.capture.delay, Duration::from_millis(250));
        assert_eq!(cfg.server.command, "python3");
        assert_eq!(cfg.server.ready_deadline(), None);
        assert_eq!(cfg.browser.navigation_timeout, Duration::from_secs(10));
        assert!(!cfg.browser.headless);
        assert_eq!(cfg.output.dir_policy, DirPolicy::BestEffort);
        assert_eq!(cfg.route_rules.len(), 2);
        cfg.validate().unwrap();
        assert_eq!(cfg.route_rules().unwrap().len(), 2);
    }

    #[test]
    fn route_rules_keep_file_order_for_ties() {
        let cfg = Config::from_toml(
            r#"
[route_rules]
"/blog/:slug" = { component = "First" }
"/:section/post" = { component = "Second" }
"/**" = true
"#,
        )
        .unwrap();
        let patterns: Vec<&str> = cfg.route_rules.iter().map(|(p, _)| p).collect();
        assert_eq!(patterns, vec!["/blog/:slug", "/:section/post", "/**"]);

        let rules = cfg.route_rules().unwrap();
        let order: Vec<&str> = rules
            .match_all("/blog/post")
            .into_iter()
            .map(|(p, _)| p.as_str())
            .collect();
        assert_eq!(order, vec!["/blog/:slug", "/:section/post", "/**"]);
        match rules.resolve("/blog/post") {
            RuleResolution::Override(fragment) => {
                assert_eq!(fragment.component.as_deref(), Some("First"))
            }
            other => panic!("expected an override, got {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("viewport = \"1x1\"\n").is_err());
        assert!(Config::from_toml("[server]\nport = 3000\n").is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.defaults.width = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.route_rules
            .insert("/**/tail", RuleValue::Toggle(false));
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.server.ready_pattern = "no group".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_reports_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/definitely/missing/ogshot.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn oversized_delay_saturates() {
        let defaults = CaptureDefaults {
            delay: Duration::MAX,
            ..CaptureDefaults::default()
        };
        let options = EffectiveOptions {
            path: "/".to_string(),
            component: "Fallback".to_string(),
            width: 1200,
            height: 630,
            provider: Provider::Browser,
            is_static: true,
            color_scheme: None,
            delay: None,
            selector: None,
            params: ImageFragment::default().params,
            render_context: Arc::new(RenderedPage::new("/", "index.html", "")),
        };
        assert_eq!(defaults.resolve(&options).delay, u64::MAX);
    }

    #[test]
    fn capture_defaults_yield_to_entry_options() {
        let defaults = CaptureDefaults {
            color_scheme: ColorScheme::Dark,
            delay: Duration::from_millis(500),
            selector: Some("#og".to_string()),
        };
        let mut options = EffectiveOptions {
            path: "/".to_string(),
            component: "Fallback".to_string(),
            width: 800,
            height: 400,
            provider: Provider::Browser,
            is_static: true,
            color_scheme: None,
            delay: None,
            selector: None,
            params: ImageFragment::default().params,
            render_context: Arc::new(RenderedPage::new("/", "index.html", "")),
        };

        let resolved = defaults.resolve(&options);
        assert_eq!(resolved.width, 800);
        assert_eq!(resolved.color_scheme, ColorScheme::Dark);
        assert_eq!(resolved.delay, 500);
        assert_eq!(resolved.selector.as_deref(), Some("#og"));

        options.color_scheme = Some(ColorScheme::Light);
        options.delay = Some(0);
        options.selector = Some("main".to_string());
        let resolved = defaults.resolve(&options);
        assert_eq!(resolved.color_scheme, ColorScheme::Light);
        assert_eq!(resolved.delay, 0);
        assert_eq!(resolved.selector.as_deref(), Some("main"));
    }
}
