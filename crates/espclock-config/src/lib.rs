//! Shared configuration for espclock tools.
//!
//! TOML device profiles layered with `ESPCLOCK_*` environment overrides,
//! and translation to `espclock_core::DeviceConfig`.

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

use espclock_core::DeviceConfig;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "ESPCLOCK_CONFIG";

/// Prefix for environment overrides (`ESPCLOCK_DEFAULTS__READ_TIMEOUT=60`).
pub const ENV_PREFIX: &str = "ESPCLOCK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no device selected and no default_device configured")]
    NoDevice,

    #[error("device '{name}' is not configured")]
    UnknownDevice { name: String },

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
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when no `--device` is given.
    pub default_device: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceProfile>,
}

/// Timeouts are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout: u64,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            reconnect_delay: default_reconnect_delay(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_request_timeout() -> u64 {
    5
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_read_timeout() -> u64 {
    30
}
fn default_reconnect_delay() -> u64 {
    30
}

/// A named clock.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceProfile {
    /// `host` or `host:port` (e.g., "192.168.1.50").
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_delay: Option<u64>,
}

impl DeviceProfile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            request_timeout: None,
            connect_timeout: None,
            read_timeout: None,
            reconnect_delay: None,
        }
    }
}

impl Config {
    /// Resolve a profile by name, falling back to `default_device`.
    pub fn device(&self, name: Option<&str>) -> Result<(&str, &DeviceProfile), ConfigError> {
        let name = name
            .or(self.default_device.as_deref())
            .ok_or(ConfigError::NoDevice)?;
        self.devices
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownDevice { name: name.into() })
    }

    /// Create or update a profile's host. The first profile becomes the
    /// default.
    pub fn set_device_host(&mut self, name: &str, host: &str) {
        self.devices
            .entry(name.to_owned())
            .and_modify(|p| host.clone_into(&mut p.host))
            .or_insert_with(|| DeviceProfile::new(host));
        if self.default_device.is_none() {
            self.default_device = Some(name.to_owned());
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$ESPCLOCK_CONFIG`, then platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("", "", "espclock").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("espclock");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config", "host", "device"]).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
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

/// Build a `DeviceConfig` from a profile, filling gaps from `defaults`.
pub fn profile_to_device_config(
    profile: &DeviceProfile,
    defaults: &Defaults,
) -> Result<DeviceConfig, ConfigError> {
    let host = profile.host.trim();
    if host.is_empty() || host.contains("://") {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("expected host or host:port, got '{}'", profile.host),
        });
    }

    Ok(DeviceConfig {
        host: host.to_owned(),
        request_timeout: seconds(
            "request_timeout",
            profile.request_timeout.unwrap_or(defaults.request_timeout),
        )?,
        connect_timeout: seconds(
            "connect_timeout",
            profile.connect_timeout.unwrap_or(defaults.connect_timeout),
        )?,
        read_timeout: seconds(
            "read_timeout",
            profile.read_timeout.unwrap_or(defaults.read_timeout),
        )?,
        reconnect_delay: seconds(
            "reconnect_delay",
            profile.reconnect_delay.unwrap_or(defaults.reconnect_delay),
        )?,
    })
}

fn seconds(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}
