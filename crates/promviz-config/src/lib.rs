//! Configuration for promviz.
//!
//! Layered with figment: built-in defaults, then a TOML file (`--config`
//! or the platform config directory), then `PROMVIZ_*` environment
//! variables with `__` separating nested keys. Also owns the precedence
//! rules for template variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use promviz_api::{TlsMode, TransportConfig};
use promviz_core::{LayoutMode, Variables};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Template variable overrides, applied over dashboard defaults.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// How to reach the metrics backend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Bearer token (plaintext; prefer `bearer_token_env`).
    pub bearer_token: Option<String>,

    /// Environment variable holding the bearer token.
    pub bearer_token_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            bearer_token: None,
            bearer_token_env: None,
            ca_cert: None,
            insecure: false,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Dashboard display defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DashboardConfig {
    /// Refresh interval when the dashboard does not set one.
    #[serde(default = "default_refresh")]
    pub default_refresh: String,

    /// Look-back window of time-series panels.
    #[serde(default = "default_range")]
    pub range: String,

    /// Range query step when a target does not set one.
    #[serde(default = "default_step")]
    pub default_step_secs: u64,

    #[serde(default)]
    pub layout: LayoutMode,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_refresh: default_refresh(),
            range: default_range(),
            default_step_secs: default_step(),
            layout: LayoutMode::default(),
        }
    }
}

fn default_refresh() -> String {
    "30s".into()
}
fn default_range() -> String {
    "24h".into()
}
fn default_step() -> u64 {
    60
}

// ── Derived settings ────────────────────────────────────────────────

impl Config {
    /// Build the HTTP transport settings for the backend.
    pub fn transport(&self) -> TransportConfig {
        let tls = if self.backend.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ca) = &self.backend.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        };
        TransportConfig {
            tls,
            timeout: Duration::from_secs(self.backend.timeout_secs.max(1)),
            bearer_token: self.bearer_token(),
        }
    }

    /// Resolve the bearer token: named env var first, then plaintext.
    pub fn bearer_token(&self) -> Option<SecretString> {
        if let Some(name) = &self.backend.bearer_token_env {
            if let Ok(value) = std::env::var(name) {
                return Some(SecretString::from(value));
            }
        }
        self.backend
            .bearer_token
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|t| SecretString::from(t.clone()))
    }

    pub fn default_refresh(&self) -> Result<Duration, ConfigError> {
        parse_duration("dashboard.default_refresh", &self.dashboard.default_refresh)
    }

    pub fn range(&self) -> Result<Duration, ConfigError> {
        parse_duration("dashboard.range", &self.dashboard.range)
    }

    pub fn default_step(&self) -> Duration {
        Duration::from_secs(self.dashboard.default_step_secs)
    }

    /// Template variables, lowest precedence first: built-in defaults,
    /// dashboard templating, this config, then `overrides` (`--var`).
    pub fn resolve_variables<'a>(
        &self,
        dashboard_defaults: &BTreeMap<String, String>,
        overrides: impl IntoIterator<Item = &'a (String, String)>,
    ) -> Variables {
        let mut vars = Variables::with_defaults();
        vars.merge(dashboard_defaults.clone());
        vars.merge(self.variables.clone());
        vars.merge(overrides.into_iter().cloned());
        vars
    }
}

/// Parse a human duration (`30s`, `5m`, `24h`) for config field `field`.
pub fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::Validation {
        field: field.into(),
        reason,
    };
    let d = humantime::parse_duration(value.trim())
        .map_err(|e| invalid(format!("{value:?}: {e}")))?;
    if d.is_zero() {
        return Err(invalid(format!("{value:?}: must be positive")));
    }
    Ok(d)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "promviz", "promviz").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("promviz");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load configuration from defaults, the TOML file and the environment.
///
/// An explicitly given `path` must exist; the default location is
/// optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::NotFound {
                path: p.to_path_buf(),
            });
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&file))
        .merge(Env::prefixed("PROMVIZ_").split("__"))
        .extract()?;

    config.default_refresh()?;
    config.range()?;
    Ok(config)
}
