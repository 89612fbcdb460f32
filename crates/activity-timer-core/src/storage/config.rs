//! TOML-based application configuration.
//!
//! Stores:
//! - "Timer still running" reminder settings
//! - Tick driver period
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;

/// Reminder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval used when `start` is not given one explicitly.
    #[serde(default)]
    pub default_interval_secs: Option<u64>,
    /// Identifier addressing the single pending reminder.
    #[serde(default = "default_reminder_id")]
    pub id: String,
    #[serde(default = "default_reminder_title")]
    pub title: String,
    /// Body text; `{subject}` is replaced by the subject label.
    #[serde(default = "default_reminder_body")]
    pub body: String,
}

/// Tick driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub ticker: TickerConfig,
}

fn default_true() -> bool {
    true
}
fn default_reminder_id() -> String {
    "activity-timer-reminder".into()
}
fn default_reminder_title() -> String {
    "Timer still running".into()
}
fn default_reminder_body() -> String {
    "Still tracking {subject}".into()
}
fn default_period_ms() -> u64 {
    1000
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_interval_secs: None,
            id: default_reminder_id(),
            title: default_reminder_title(),
            body: default_reminder_body(),
        }
    }
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
        }
    }
}

impl ReminderConfig {
    /// The interval to use for a run started without an explicit one.
    pub fn default_interval(&self) -> Option<std::time::Duration> {
        if !self.enabled {
            return None;
        }
        self.default_interval_secs
            .filter(|&secs| secs > 0)
            .map(std::time::Duration::from_secs)
    }
}

impl TickerConfig {
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.period_ms.max(1))
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
        if parts.peek().map_or(true, |p| p.is_empty()) {
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
                            .map_err(|e| invalid(e.to_string()))?
                            .into(),
                    ),
                    // Optional numbers serialize as null; "none" clears them.
                    serde_json::Value::Null => match value {
                        "none" | "null" | "" => serde_json::Value::Null,
                        v => serde_json::Value::Number(
                            v.parse::<u64>().map_err(|e| invalid(e.to_string()))?.into(),
                        ),
                    },
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default config file location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
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
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

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

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
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

    /// Set a config value by key and save to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert!(cfg.reminder.enabled);
        assert_eq!(cfg.reminder.default_interval_secs, None);
        assert_eq!(cfg.reminder.id, "activity-timer-reminder");
        assert_eq!(cfg.reminder.title, "Timer still running");
        assert_eq!(cfg.ticker.period_ms, 1000);
        assert_eq!(cfg.ticker.period(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[reminder]\ndefault_interval_secs = 600\n").unwrap();
        assert_eq!(cfg.reminder.default_interval_secs, Some(600));
        assert_eq!(cfg.reminder.title, "Timer still running");
        assert_eq!(cfg.ticker.period_ms, 1000);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("reminder.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("ticker.period_ms").as_deref(), Some("1000"));
        assert_eq!(cfg.get("reminder.title").as_deref(), Some("Timer still running"));
        assert!(cfg.get("reminder.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.apply("reminder.enabled", "false").unwrap();
        cfg.apply("ticker.period_ms", "250").unwrap();
        cfg.apply("reminder.body", "Still on {subject}?").unwrap();
        cfg.apply("reminder.default_interval_secs", "1800").unwrap();
        assert!(!cfg.reminder.enabled);
        assert_eq!(cfg.ticker.period_ms, 250);
        assert_eq!(cfg.reminder.body, "Still on {subject}?");
        assert_eq!(cfg.reminder.default_interval_secs, Some(1800));

        cfg.apply("reminder.default_interval_secs", "none").unwrap();
        assert_eq!(cfg.reminder.default_interval_secs, None);
    }

    #[test]
    fn apply_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("reminder.nonexistent", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.apply("reminder.enabled", "not_a_bool"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.apply("ticker.period_ms", "-5").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn default_interval_respects_enabled_flag() {
        let mut reminder = ReminderConfig::default();
        assert_eq!(reminder.default_interval(), None);
        reminder.default_interval_secs = Some(60);
        assert_eq!(reminder.default_interval(), Some(std::time::Duration::from_secs(60)));
        reminder.enabled = false;
        assert_eq!(reminder.default_interval(), None);
        reminder.enabled = true;
        reminder.default_interval_secs = Some(0);
        assert_eq!(reminder.default_interval(), None);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.apply("ticker.period_ms", "500").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().ticker.period_ms, 500);
    }

    #[test]
    fn load_from_rejects_malformed_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "reminder = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
