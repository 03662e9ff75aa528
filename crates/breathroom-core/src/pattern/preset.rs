use serde::{Deserialize, Serialize};

use super::BreathPattern;
use crate::cue::SoundProfile;
use crate::error::PatternError;
use crate::ramp::RampConfig;

/// Background loop played while a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbientSound {
    Rain,
    Ocean,
    Forest,
    Wind,
    Fireplace,
}

impl AmbientSound {
    pub fn id(self) -> &'static str {
        match self {
            AmbientSound::Rain => "rain",
            AmbientSound::Ocean => "ocean",
            AmbientSound::Forest => "forest",
            AmbientSound::Wind => "wind",
            AmbientSound::Fireplace => "fireplace",
        }
    }
}

/// Read-only bundle that seeds a session for a given purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurposePreset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub pattern: BreathPattern,
    /// Session length in minutes.
    pub duration_min: u32,
    #[serde(default)]
    pub sound_profile: Option<SoundProfile>,
    #[serde(default)]
    pub ambient_sound: Option<AmbientSound>,
    #[serde(default)]
    pub ramp: Option<RampConfig>,
}

impl PurposePreset {
    pub fn validate(&self) -> Result<(), PatternError> {
        if self.id.trim().is_empty() {
            return Err(PatternError::EmptyId);
        }
        self.pattern.validate()?;
        if self.duration_min == 0 {
            return Err(PatternError::InvalidPresetDuration(self.id.clone()));
        }
        if let Some(ramp) = &self.ramp {
            ramp.validate()?;
        }
        Ok(())
    }

    pub fn duration_secs(&self) -> f64 {
        f64::from(self.duration_min) * 60.0
    }
}
