//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default pattern or purpose preset and session length
//! - Countdown and tick interval
//! - Sound, haptic and ambient preferences
//! - Custom breath patterns
//!
//! Configuration is stored at `~/.config/breathroom/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::cue::{CueSettings, SoundProfile};
use crate::error::{ConfigError, CoreError, PatternError};
use crate::pattern::{AmbientSound, BreathPattern, PatternLibrary};
use crate::session::SessionSettings;

/// Session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_pattern")]
    pub default_pattern: String,
    /// When set, overrides `default_pattern` and `duration_min`.
    #[serde(default)]
    pub default_preset: Option<String>,
    #[serde(default = "default_duration_min")]
    pub duration_min: u32,
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Phase sound configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 0-100
    #[serde(default = "default_50")]
    pub volume: u32,
    #[serde(default)]
    pub profile: SoundProfile,
    #[serde(default)]
    pub mute_hold_phases: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HapticsConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Background loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbientConfig {
    #[serde(default)]
    pub sound: Option<AmbientSound>,
    /// 0-100
    #[serde(default = "default_ambient_volume")]
    pub volume: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/breathroom/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub sound: SoundConfig,
    #[serde(default)]
    pub haptics: HapticsConfig,
    #[serde(default)]
    pub ambient: AmbientConfig,
    /// User-defined patterns, validated on load.
    #[serde(default)]
    pub custom_patterns: Vec<BreathPattern>,
}

// Default functions
fn default_pattern() -> String {
    "4-7-8".into()
}
fn default_duration_min() -> u32 {
    5
}
fn default_countdown_secs() -> u32 {
    crate::session::DEFAULT_COUNTDOWN_SECS
}
fn default_tick_interval_ms() -> u64 {
    100
}
fn default_true() -> bool {
    true
}
fn default_50() -> u32 {
    50
}
fn default_ambient_volume() -> u32 {
    30
}

const TICK_INTERVAL_RANGE_MS: std::ops::RangeInclusive<u64> = 50..=1000;

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_pattern: default_pattern(),
            default_preset: None,
            duration_min: default_duration_min(),
            countdown_secs: default_countdown_secs(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 50,
            profile: SoundProfile::default(),
            mute_hold_phases: false,
        }
    }
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            sound: None,
            volume: default_ambient_volume(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            sound: SoundConfig::default(),
            haptics: HapticsConfig::default(),
            ambient: AmbientConfig::default(),
            custom_patterns: Vec::new(),
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
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    invalid(format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Optional fields: "none" clears them.
                    serde_json::Value::Null | serde_json::Value::String(_)
                        if value.eq_ignore_ascii_case("none") =>
                    {
                        serde_json::Value::Null
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
        Ok(data_dir()?.join("config.toml"))
    }

    /// Where `load` and `save` read and write.
    pub fn file_path() -> Result<PathBuf, ConfigError> {
        Self::path()
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
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

    /// Persist to disk.
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
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        if self.session.duration_min == 0 {
            return Err(invalid("session.duration_min", "must be at least 1".into()));
        }
        if !TICK_INTERVAL_RANGE_MS.contains(&self.session.tick_interval_ms) {
            return Err(invalid(
                "session.tick_interval_ms",
                format!(
                    "must be between {} and {}",
                    TICK_INTERVAL_RANGE_MS.start(),
                    TICK_INTERVAL_RANGE_MS.end()
                ),
            ));
        }
        if self.sound.volume > 100 {
            return Err(invalid("sound.volume", "must be between 0 and 100".into()));
        }
        if self.ambient.volume > 100 {
            return Err(invalid("ambient.volume", "must be between 0 and 100".into()));
        }
        Ok(())
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

    /// Set a value in memory by dot-separated key, validating the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is rejected.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.session.tick_interval_ms)
    }

    pub fn cue_settings(&self) -> CueSettings {
        CueSettings {
            sound_enabled: self.sound.enabled,
            volume: f64::from(self.sound.volume.min(100)) / 100.0,
            sound_profile: self.sound.profile,
            haptic_enabled: self.haptics.enabled,
            mute_hold_phases: self.sound.mute_hold_phases,
        }
    }

    pub fn ambient_volume(&self) -> f64 {
        f64::from(self.ambient.volume.min(100)) / 100.0
    }

    /// Built-in catalog plus this config's custom patterns.
    pub fn library(&self) -> Result<PatternLibrary, PatternError> {
        PatternLibrary::builtin()?.with_custom_patterns(self.custom_patterns.iter().cloned())
    }

    /// Session inputs for the configured default pattern or preset.
    pub fn session_settings(&self, library: &PatternLibrary) -> Result<SessionSettings, CoreError> {
        let settings = match &self.session.default_preset {
            Some(id) => SessionSettings::from_preset(library.get_preset(id)?),
            None => SessionSettings::new(
                library.get(&self.session.default_pattern)?.clone(),
                f64::from(self.session.duration_min) * 60.0,
            ),
        }
        .with_countdown(self.session.countdown_secs);
        settings.validate()?;
        Ok(settings)
    }
}
