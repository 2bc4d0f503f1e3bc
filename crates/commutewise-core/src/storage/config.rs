//! TOML-based application configuration.
//!
//! Stores the commute profile and analysis preferences:
//! - Home and work addresses
//! - Morning and evening sampling windows
//! - Sampling interval, traffic model, pacing and timeout
//! - Proxy location
//!
//! Configuration is stored at `~/.config/commutewise/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::analysis::{AnalysisMode, OrchestratorConfig};
use crate::error::ConfigError;
use crate::provider::TrafficModel;
use crate::slots::{TimeSlot, TimeWindow};

/// Addresses for the single commute profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub home_address: String,
    #[serde(default)]
    pub work_address: String,
}

/// Morning and evening sampling windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowsConfig {
    #[serde(default = "default_morning")]
    pub morning: TimeWindow,
    #[serde(default = "default_evening")]
    pub evening: TimeWindow,
}

/// Traffic model preference, including compare-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSetting {
    Optimistic,
    BestGuess,
    Pessimistic,
    CompareAll,
}

impl ModelSetting {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            ModelSetting::Optimistic => AnalysisMode::Single(TrafficModel::Optimistic),
            ModelSetting::BestGuess => AnalysisMode::Single(TrafficModel::BestGuess),
            ModelSetting::Pessimistic => AnalysisMode::Single(TrafficModel::Pessimistic),
            ModelSetting::CompareAll => AnalysisMode::CompareAll,
        }
    }
}

impl std::str::FromStr for ModelSetting {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compare_all" => Ok(ModelSetting::CompareAll),
            other => Ok(match other.parse::<TrafficModel>()? {
                TrafficModel::Optimistic => ModelSetting::Optimistic,
                TrafficModel::BestGuess => ModelSetting::BestGuess,
                TrafficModel::Pessimistic => ModelSetting::Pessimistic,
            }),
        }
    }
}

/// Sampling preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default = "default_traffic_model")]
    pub traffic_model: ModelSetting,
    /// Delay after each provider call.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

/// Where the rate-limited proxy lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_url")]
    pub url: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/commutewise/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub windows: WindowsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

// Default functions
fn default_morning() -> TimeWindow {
    window(6, 0, 10, 0)
}
fn default_evening() -> TimeWindow {
    window(15, 0, 19, 0)
}
fn default_interval_minutes() -> u32 {
    15
}
fn default_traffic_model() -> ModelSetting {
    ModelSetting::BestGuess
}
fn default_pacing_ms() -> u64 {
    1000
}
fn default_call_timeout_secs() -> u64 {
    15
}
fn default_proxy_url() -> String {
    "http://127.0.0.1:8787".into()
}

fn window(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeWindow {
    let start = TimeSlot::new(start_h, start_m).unwrap_or_default();
    let end = TimeSlot::new(end_h, end_m).unwrap_or_default();
    TimeWindow::new(start, end)
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            morning: default_morning(),
            evening: default_evening(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            traffic_model: default_traffic_model(),
            pacing_ms: default_pacing_ms(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            url: default_proxy_url(),
        }
    }
}

impl AnalysisConfig {
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            pacing: Duration::from_millis(self.pacing_ms),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".to_string(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("~/.config/commutewise"),
                message: e.to_string(),
            })
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field (e.g. a malformed `HH:MM` time or an unknown traffic model).
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Update a value by key and persist to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Home and work addresses, or the first missing key.
    pub fn addresses(&self) -> Result<(&str, &str), ConfigError> {
        let home = self.profile.home_address.trim();
        let work = self.profile.work_address.trim();
        if home.is_empty() {
            return Err(ConfigError::MissingKey("profile.home_address".to_string()));
        }
        if work.is_empty() {
            return Err(ConfigError::MissingKey("profile.work_address".to_string()));
        }
        Ok((home, work))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
