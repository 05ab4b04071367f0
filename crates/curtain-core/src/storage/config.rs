//! TOML-based application configuration.
//!
//! Stores:
//! - The countdown target instant and tick interval
//! - Track sources and the identifiers used to locate the audio element
//! - Snapshot and prompt timing
//! - The reveal query parameter and snippet length
//!
//! Configuration is stored at `~/.config/curtain/config.toml`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;

/// Countdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownConfig {
    #[serde(default = "default_target")]
    pub target: DateTime<Utc>,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Audio session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_main_track")]
    pub main_track: String,
    #[serde(default = "default_countdown_track")]
    pub countdown_track: String,
    /// Identifiers tried in order when locating the shared element. The last
    /// one is used when a new element has to be created.
    #[serde(default = "default_resource_ids")]
    pub resource_ids: Vec<String>,
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
    #[serde(default = "default_sound_prompt_delay_ms")]
    pub sound_prompt_delay_ms: u64,
}

/// Reveal gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealConfig {
    #[serde(default = "default_query_param")]
    pub query_param: String,
    #[serde(default = "default_snippet_ms")]
    pub snippet_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/curtain/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub countdown: CountdownConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub reveal: RevealConfig,
}

// Default functions
fn default_target() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 12, 23, 40, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_main_track() -> String {
    "audio/main-song.mp3".into()
}
fn default_countdown_track() -> String {
    "audio/countdown-song.mp3".into()
}
fn default_resource_ids() -> Vec<String> {
    vec!["birthday-song".into(), "global-audio".into()]
}
fn default_snapshot_interval_ms() -> u64 {
    500
}
fn default_sound_prompt_delay_ms() -> u64 {
    800
}
fn default_query_param() -> String {
    "reveal".into()
}
fn default_snippet_ms() -> u64 {
    2000
}

/// Upper bound for every millisecond setting (one day).
pub const MAX_INTERVAL_MS: u64 = 86_400_000;

/// `ms` clamped into `[min, MAX_INTERVAL_MS]`, which always fits an `i64`.
fn bounded_ms(ms: u64, min: u64) -> Duration {
    Duration::milliseconds(ms.clamp(min, MAX_INTERVAL_MS) as i64)
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            main_track: default_main_track(),
            countdown_track: default_countdown_track(),
            resource_ids: default_resource_ids(),
            snapshot_interval_ms: default_snapshot_interval_ms(),
            sound_prompt_delay_ms: default_sound_prompt_delay_ms(),
        }
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            query_param: default_query_param(),
            snippet_ms: default_snippet_ms(),
        }
    }
}

impl CountdownConfig {
    pub fn tick_interval(&self) -> Duration {
        bounded_ms(self.tick_interval_ms, 1)
    }
}

impl AudioConfig {
    pub fn snapshot_interval(&self) -> Duration {
        bounded_ms(self.snapshot_interval_ms, 1)
    }

    pub fn sound_prompt_delay(&self) -> Duration {
        bounded_ms(self.sound_prompt_delay_ms, 0)
    }
}

impl RevealConfig {
    pub fn snippet_duration(&self) -> Duration {
        bounded_ms(self.snippet_ms, 1)
    }
}

impl Config {
    /// Rejects millisecond settings the scheduler cannot run: zero periods
    /// and anything above [`MAX_INTERVAL_MS`].
    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("countdown.tick_interval_ms", self.countdown.tick_interval_ms, 1),
            ("audio.snapshot_interval_ms", self.audio.snapshot_interval_ms, 1),
            ("audio.sound_prompt_delay_ms", self.audio.sound_prompt_delay_ms, 0),
            ("reveal.snippet_ms", self.reveal.snippet_ms, 1),
        ];
        for (key, ms, min) in checks {
            if !(min..=MAX_INTERVAL_MS).contains(&ms) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{ms} is outside {min}..={MAX_INTERVAL_MS} ms"),
                });
            }
        }
        Ok(())
    }

    fn from_toml(content: &str, path: PathBuf) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(content).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        cfg.validate().map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(cfg)
    }

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
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
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

    /// Path of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds an out-of-range interval, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content, path),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
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
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field (an unparseable target instant, an interval outside
    /// `1..=MAX_INTERVAL_MS`). The config is left unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
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
        assert_eq!(parsed.countdown.target, cfg.countdown.target);
        assert_eq!(parsed.audio.resource_ids, cfg.audio.resource_ids);
        assert_eq!(parsed.reveal.snippet_ms, 2000);
    }

    #[test]
    fn default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.countdown.target.to_rfc3339(), "2026-01-12T23:40:00+00:00");
        assert_eq!(cfg.countdown.tick_interval_ms, 1000);
        assert_eq!(cfg.audio.snapshot_interval_ms, 500);
        assert_eq!(cfg.audio.sound_prompt_delay_ms, 800);
        assert_eq!(cfg.audio.main_track, "audio/main-song.mp3");
        assert_eq!(cfg.audio.countdown_track, "audio/countdown-song.mp3");
        assert_eq!(cfg.reveal.query_param, "reveal");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            "[countdown]\ntarget = \"2030-06-01T00:00:00Z\"\n",
        )
        .unwrap();
        assert_eq!(parsed.countdown.target.to_rfc3339(), "2030-06-01T00:00:00+00:00");
        assert_eq!(parsed.countdown.tick_interval_ms, 1000);
        assert_eq!(parsed.reveal.snippet_ms, 2000);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("reveal.snippet_ms").as_deref(), Some("2000"));
        assert_eq!(cfg.get("audio.main_track").as_deref(), Some("audio/main-song.mp3"));
        assert!(cfg.get("audio.missing_key").is_none());
    }

    #[test]
    fn apply_updates_target_instant() {
        let mut cfg = Config::default();
        cfg.apply("countdown.target", "2027-02-03T04:05:06Z").unwrap();
        assert_eq!(cfg.countdown.target.to_rfc3339(), "2027-02-03T04:05:06+00:00");
    }

    #[test]
    fn apply_rejects_bad_target() {
        let mut cfg = Config::default();
        let err = cfg.apply("countdown.target", "next tuesday").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(cfg.countdown.target, default_target());
    }

    #[test]
    fn apply_updates_array_from_json() {
        let mut cfg = Config::default();
        cfg.apply("audio.resource_ids", "[\"player\"]").unwrap();
        assert_eq!(cfg.audio.resource_ids, vec!["player".to_string()]);
    }

    #[test]
    fn apply_rejects_interval_the_scheduler_cannot_run() {
        let mut cfg = Config::default();
        for (key, value) in [
            ("countdown.tick_interval_ms", "18446744073709551615"),
            ("countdown.tick_interval_ms", "0"),
            ("audio.snapshot_interval_ms", "86400001"),
            ("reveal.snippet_ms", "0"),
        ] {
            let err = cfg.apply(key, value).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }), "{key}={value}");
        }
        assert_eq!(cfg.countdown.tick_interval_ms, 1000);
        assert_eq!(cfg.audio.snapshot_interval_ms, 500);
        assert_eq!(cfg.reveal.snippet_ms, 2000);

        cfg.apply("audio.sound_prompt_delay_ms", "0").unwrap();
        cfg.apply("countdown.tick_interval_ms", "86400000").unwrap();
        assert_eq!(cfg.countdown.tick_interval(), Duration::days(1));
    }

    #[test]
    fn file_with_out_of_range_interval_fails_to_load() {
        let err = Config::from_toml(
            "[countdown]\ntick_interval_ms = 0\n",
            PathBuf::from("config.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed { .. }));
    }

    #[test]
    fn interval_helpers_stay_positive_and_bounded() {
        let mut cfg = Config::default();
        cfg.countdown.tick_interval_ms = u64::MAX;
        cfg.audio.snapshot_interval_ms = 0;
        assert_eq!(cfg.countdown.tick_interval(), Duration::milliseconds(MAX_INTERVAL_MS as i64));
        assert_eq!(cfg.audio.snapshot_interval(), Duration::milliseconds(1));
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "audio.nonexistent_key", "value");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_json_value_by_path_rejects_non_numeric_interval() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "reveal.snippet_ms", "soon");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
