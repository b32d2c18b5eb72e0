//! Shared configuration for the campus notification client.
//!
//! TOML profiles, environment overrides, platform paths, and translation
//! to `campus_core::ClientConfig`. The CLI layers its flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use campus_core::{Backoff, ClientConfig, ReconnectConfig, Severity};

/// Reconnect ceiling for `reconnect = "bounded"` profiles without `max_retries`.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

const DEFAULT_MAX_BACKOFF_SECS: u64 = 60;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectMode {
    /// Retry forever.
    #[default]
    Always,
    /// Give up after `max_retries` attempts.
    Bounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffMode {
    #[default]
    Fixed,
    Exponential,
}

/// What to do about native desktop notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DesktopMode {
    /// Ask on the first notification.
    #[default]
    Ask,
    Granted,
    Denied,
}

/// A named deployment profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Incident API stage root (e.g. "https://api.example.edu/dev").
    pub api_url: String,

    /// Notification socket base (e.g. "wss://ws.example.edu/dev").
    pub ws_url: String,

    /// Viewer email; the API authorizes by it.
    pub email: String,

    /// Display name.
    pub name: Option<String>,

    #[serde(default)]
    pub reconnect: ReconnectMode,

    pub max_retries: Option<u32>,

    pub reconnect_delay_secs: Option<u64>,

    #[serde(default)]
    pub backoff: BackoffMode,

    pub max_backoff_secs: Option<u64>,

    /// Wait between a state change and the list re-fetch.
    pub settle_delay_ms: Option<u64>,

    /// Toast lifetime.
    pub toast_secs: Option<u64>,

    #[serde(default)]
    pub desktop: DesktopMode,

    /// Merge refresh requests within this window. 0 or unset disables it.
    pub coalesce_ms: Option<u64>,

    /// HTTP timeout override.
    pub timeout: Option<u64>,

    /// Notification history file. Defaults to the platform data dir.
    pub history_file: Option<PathBuf>,

    /// Extra state → notification kind mappings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub severity: BTreeMap<String, Severity>,
}

impl Profile {
    pub fn new(
        api_url: impl Into<String>,
        ws_url: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            ws_url: ws_url.into(),
            email: email.into(),
            name: None,
            reconnect: ReconnectMode::default(),
            max_retries: None,
            reconnect_delay_secs: None,
            backoff: BackoffMode::default(),
            max_backoff_secs: None,
            settle_delay_ms: None,
            toast_secs: None,
            desktop: DesktopMode::default(),
            coalesce_ms: None,
            timeout: None,
            history_file: None,
            severity: BTreeMap::new(),
        }
    }

    /// Reconnect policy described by this profile.
    pub fn reconnect_config(&self) -> ReconnectConfig {
        let mut policy = match self.reconnect {
            ReconnectMode::Always => ReconnectConfig::always_on(),
            ReconnectMode::Bounded => {
                ReconnectConfig::bounded(self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES))
            }
        };
        if let Some(secs) = self.reconnect_delay_secs {
            policy = policy.with_delay(Duration::from_secs(secs));
        }
        match self.backoff {
            BackoffMode::Fixed => policy,
            BackoffMode::Exponential => policy.with_backoff(Backoff::Exponential {
                max_delay: Duration::from_secs(
                    self.max_backoff_secs.unwrap_or(DEFAULT_MAX_BACKOFF_SECS),
                ),
            }),
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("edu", "campus", "campus-notify")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("campus-notify");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default notification history file.
pub fn default_history_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state.json"),
        |dirs| dirs.data_dir().join("state.json"),
    )
}

/// History file for a profile: its override, or the platform default.
pub fn history_path(profile: &Profile) -> PathBuf {
    profile
        .history_file
        .clone()
        .unwrap_or_else(default_history_path)
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load the full Config from the canonical file and environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, then `CAMPUS_*` variables (`__` separates nesting,
/// e.g. `CAMPUS_PROFILES__DEFAULT__EMAIL`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CAMPUS_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if it is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Saving ──────────────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ClientConfig` from a profile, without CLI overrides.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<ClientConfig, ConfigError> {
    let api_url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: format!("profiles.{profile_name}.api_url"),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;

    let email = profile.email.trim();
    if email.is_empty() {
        return Err(ConfigError::Validation {
            field: format!("profiles.{profile_name}.email"),
            reason: "an email is required".into(),
        });
    }

    let mut config = ClientConfig::new(api_url, profile.ws_url.trim(), email);
    config.reconnect = profile.reconnect_config();
    if let Some(ms) = profile.settle_delay_ms {
        config.settle_delay = Duration::from_millis(ms);
    }
    config.coalesce_window = profile
        .coalesce_ms
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis);
    if let Some(secs) = profile.toast_secs {
        config.presenter.toast_lifetime = Duration::from_secs(secs);
    }
    for (state, severity) in &profile.severity {
        config.presenter.severity.set(state, *severity);
    }
    config.transport.timeout = Duration::from_secs(profile.timeout.unwrap_or(default_timeout()));

    Ok(config)
}
