use serde::{Deserialize, Serialize};

use crate::error::{CoreError, SessionError};
use crate::pattern::{BreathPattern, PurposePreset};
use crate::ramp::{self, RampConfig};

/// Pre-roll before session time starts.
pub const DEFAULT_COUNTDOWN_SECS: u32 = 3;

/// Inputs that define one session. Fixed from `start()` until the session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub pattern: BreathPattern,
    pub total_duration_secs: f64,
    #[serde(default)]
    pub ramp: Option<RampConfig>,
    #[serde(default = "default_countdown")]
    pub countdown_secs: u32,
}

fn default_countdown() -> u32 {
    DEFAULT_COUNTDOWN_SECS
}

/// Where a session stands in its breath cycle at a given elapsed time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Frame {
    pub pattern: BreathPattern,
    pub ramp_progress: f64,
    /// Fractional number of cycles completed.
    pub cycles: f64,
    /// Seconds into the current cycle.
    pub cycle_clock: f64,
}

impl SessionSettings {
    pub fn new(pattern: BreathPattern, total_duration_secs: f64) -> Self {
        Self {
            pattern,
            total_duration_secs,
            ramp: None,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
        }
    }

    pub fn with_ramp(mut self, ramp: RampConfig) -> Self {
        self.ramp = Some(ramp);
        self
    }

    pub fn with_countdown(mut self, countdown_secs: u32) -> Self {
        self.countdown_secs = countdown_secs;
        self
    }

    pub fn from_preset(preset: &PurposePreset) -> Self {
        Self {
            pattern: preset.pattern.clone(),
            total_duration_secs: preset.duration_secs(),
            ramp: preset.ramp.clone(),
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
        }
    }

    /// # Errors
    /// Rejects invalid patterns or ramps and any total duration that is not a
    /// positive finite number of seconds. The duration is never clamped.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.pattern.validate()?;
        if let Some(ramp) = &self.ramp {
            ramp.validate()?;
        }
        if !self.total_duration_secs.is_finite() || self.total_duration_secs <= 0.0 {
            return Err(SessionError::InvalidSettings(format!(
                "total duration must be a positive number of seconds, got {}",
                self.total_duration_secs
            ))
            .into());
        }
        Ok(())
    }

    /// The ramp, if one is configured and enabled.
    pub fn active_ramp(&self) -> Option<&RampConfig> {
        self.ramp.as_ref().filter(|r| r.enabled)
    }

    pub(crate) fn frame_at(&self, elapsed_secs: f64) -> Frame {
        match self.active_ramp() {
            Some(config) => {
                let sample = ramp::interpolate(config, elapsed_secs);
                let cycles = ramp::cycle_position(config, elapsed_secs);
                let cycle_clock = cycles.fract() * sample.pattern.cycle_duration();
                Frame {
                    pattern: sample.pattern,
                    ramp_progress: sample.progress,
                    cycles,
                    cycle_clock,
                }
            }
            None => {
                let cycle = self.pattern.cycle_duration();
                Frame {
                    pattern: self.pattern.clone(),
                    ramp_progress: 1.0,
                    cycles: elapsed_secs / cycle,
                    cycle_clock: elapsed_secs % cycle,
                }
            }
        }
    }
}
