//! TOML-based application configuration.
//!
//! Holds:
//! - REST server settings (bind address, CORS origin, database location)
//! - Client settings (remote API used instead of the local database)
//! - Timer durations
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::ModePolicy;

/// REST server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Reported by the health endpoint.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Empty means `<data_dir>/studyhub.db`.
    #[serde(default)]
    pub database_path: String,
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    /// Pomodoro API prefix, e.g. `http://localhost:5000/api/v1/pomodoro`.
    /// Empty means the local database is used directly.
    #[serde(default)]
    pub api_url: String,
}

/// Timer durations in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u64,
    #[serde(default = "default_short_minutes")]
    pub short_minutes: u64,
    #[serde(default = "default_long_minutes")]
    pub long_minutes: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub timer: TimerConfig,
}

// Default functions
fn default_bind() -> String {
    "0.0.0.0:5000".into()
}
fn default_cors_origin() -> String {
    "http://localhost:3000".into()
}
fn default_environment() -> String {
    "development".into()
}
fn default_work_minutes() -> u64 {
    25
}
fn default_short_minutes() -> u64 {
    5
}
fn default_long_minutes() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origin: default_cors_origin(),
            environment: default_environment(),
            database_path: String::new(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_minutes: default_short_minutes(),
            long_minutes: default_long_minutes(),
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
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
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

    /// Location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults first if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds a zero duration, or if the default config cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).map_err(|message| ConfigError::LoadFailed {
                path: path.clone(),
                message,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    fn parse(content: &str) -> Result<Self, String> {
        let cfg: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        cfg.timer.validate().map_err(|e| e.to_string())?;
        Ok(cfg)
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a leaf value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// as the type of the existing value.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.timer.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// The configured remote API, if any.
    pub fn api_url(&self) -> Option<&str> {
        let url = self.client.api_url.trim();
        (!url.is_empty()).then_some(url)
    }

    /// Database file used by the server and the local CLI store.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if self.server.database_path.trim().is_empty() {
            Ok(data_dir()?.join("studyhub.db"))
        } else {
            Ok(PathBuf::from(self.server.database_path.trim()))
        }
    }

    /// Apply server environment overrides: `PORT`, `CORS_ORIGIN`,
    /// `STUDYHUB_ENV`, `STUDYHUB_DB`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            let host = self
                .server
                .bind
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".into());
            self.server.bind = format!("{host}:{port}");
        }
        if let Ok(origin) = std::env::var("CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Ok(env) = std::env::var("STUDYHUB_ENV") {
            self.server.environment = env;
        }
        if let Ok(db) = std::env::var("STUDYHUB_DB") {
            self.server.database_path = db;
        }
        self
    }

    pub fn mode_policy(&self) -> ModePolicy {
        self.timer.policy()
    }
}

impl TimerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (key, minutes) in [
            ("timer.work_minutes", self.work_minutes),
            ("timer.short_minutes", self.short_minutes),
            ("timer.long_minutes", self.long_minutes),
        ] {
            if minutes == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be at least 1 minute".into(),
                });
            }
        }
        Ok(())
    }

    pub fn policy(&self) -> ModePolicy {
        ModePolicy {
            work_secs: self.work_minutes.saturating_mul(60),
            short_secs: self.short_minutes.saturating_mul(60),
            long_secs: self.long_minutes.saturating_mul(60),
        }
    }
}
