//! Built-in pattern and preset catalog.
//!
//! # Patterns
//! - **4-7-8**: Relaxing breath (sleep, anxiety). The default.
//! - **box**: Equal four-count box breathing (focus)
//! - **calm**: Short coherence breath
//! - **coherence**: Six-second resonance breathing
//! - **deep-relax**: Doubled exhale
//! - **7-11**: Long exhale for acute stress
//! - **awake**: Fast inhale, short exhale (energy)
//! - **triangle**: Inhale, hold, exhale
//! - **tactical**: Extended box
//! - **buteyko**: Reduced breathing with a pause after exhale
//! - **gentle**: 3-5-3 warm-up used as a ramp starting point

use std::collections::HashSet;

use super::{AmbientSound, BreathPattern, PurposePreset};
use crate::cue::SoundProfile;
use crate::error::PatternError;
use crate::ramp::RampConfig;

const DEFAULT_PATTERN_ID: &str = "4-7-8";

/// Immutable, validated catalog of patterns and purpose presets.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    patterns: Vec<BreathPattern>,
    presets: Vec<PurposePreset>,
}

impl PatternLibrary {
    /// Build a library, validating every entry.
    ///
    /// # Errors
    /// Returns the first invalid pattern or preset, a duplicated id, or a
    /// missing default pattern.
    pub fn new(
        patterns: Vec<BreathPattern>,
        presets: Vec<PurposePreset>,
    ) -> Result<Self, PatternError> {
        let mut seen = HashSet::new();
        for pattern in &patterns {
            pattern.validate()?;
            if !seen.insert(pattern.id.as_str()) {
                return Err(PatternError::Duplicate {
                    kind: "pattern",
                    id: pattern.id.clone(),
                });
            }
        }
        if !seen.contains(DEFAULT_PATTERN_ID) {
            return Err(PatternError::NotFound {
                kind: "pattern",
                id: DEFAULT_PATTERN_ID.to_string(),
            });
        }

        let mut seen = HashSet::new();
        for preset in &presets {
            preset.validate()?;
            if !seen.insert(preset.id.as_str()) {
                return Err(PatternError::Duplicate {
                    kind: "preset",
                    id: preset.id.clone(),
                });
            }
        }

        Ok(Self { patterns, presets })
    }

    /// The built-in catalog.
    pub fn builtin() -> Result<Self, PatternError> {
        Self::new(builtin_patterns(), builtin_presets())
    }

    /// Add user-defined patterns. A custom pattern may not shadow a built-in id.
    pub fn with_custom_patterns(
        self,
        custom: impl IntoIterator<Item = BreathPattern>,
    ) -> Result<Self, PatternError> {
        let mut patterns = self.patterns;
        patterns.extend(custom);
        Self::new(patterns, self.presets)
    }

    pub fn find(&self, id: &str) -> Option<&BreathPattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// Like [`find`](Self::find) but with an error naming the missing id.
    pub fn get(&self, id: &str) -> Result<&BreathPattern, PatternError> {
        self.find(id).ok_or_else(|| PatternError::NotFound {
            kind: "pattern",
            id: id.to_string(),
        })
    }

    pub fn find_preset(&self, id: &str) -> Option<&PurposePreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn get_preset(&self, id: &str) -> Result<&PurposePreset, PatternError> {
        self.find_preset(id).ok_or_else(|| PatternError::NotFound {
            kind: "preset",
            id: id.to_string(),
        })
    }

    pub fn default_pattern(&self) -> &BreathPattern {
        // Presence is checked in `new`.
        self.find(DEFAULT_PATTERN_ID).unwrap_or(&self.patterns[0])
    }

    pub fn patterns(&self) -> &[BreathPattern] {
        &self.patterns
    }

    pub fn presets(&self) -> &[PurposePreset] {
        &self.presets
    }
}

fn pattern(id: &str, name: &str, timings: [f64; 4], description: &str) -> BreathPattern {
    let [inhale, hold1, exhale, hold2] = timings;
    BreathPattern {
        id: id.to_string(),
        name: name.to_string(),
        inhale,
        hold1,
        exhale,
        hold2,
        description: Some(description.to_string()),
    }
}

fn builtin_patterns() -> Vec<BreathPattern> {
    vec![
        pattern(
            "4-7-8",
            "Relaxing Breath",
            [4.0, 7.0, 8.0, 0.0],
            "A natural tranquilizer for the nervous system.",
        ),
        pattern(
            "box",
            "Box Breathing",
            [4.0, 4.0, 4.0, 4.0],
            "Equal counts on every side to steady attention.",
        ),
        pattern(
            "calm",
            "Calm",
            [4.0, 0.0, 6.0, 0.0],
            "A slightly longer exhale to settle the body.",
        ),
        pattern(
            "coherence",
            "Coherent Breathing",
            [6.0, 0.0, 6.0, 0.0],
            "About five breaths a minute for heart rate variability.",
        ),
        pattern(
            "deep-relax",
            "Deep Relaxation",
            [4.0, 0.0, 8.0, 0.0],
            "Doubling the exhale to invite rest.",
        ),
        pattern(
            "7-11",
            "7-11 Breathing",
            [7.0, 0.0, 11.0, 0.0],
            "Long, slow breaths for moments of panic.",
        ),
        pattern(
            "awake",
            "Energizing Breath",
            [4.0, 0.0, 2.0, 0.0],
            "A brisk rhythm to raise alertness.",
        ),
        pattern(
            "triangle",
            "Triangle Breathing",
            [4.0, 4.0, 4.0, 0.0],
            "Three even sides for emotional balance.",
        ),
        pattern(
            "tactical",
            "Tactical Breathing",
            [5.0, 5.0, 5.0, 5.0],
            "Extended box breathing for high-pressure moments.",
        ),
        pattern(
            "buteyko",
            "Reduced Breathing",
            [3.0, 0.0, 3.0, 4.0],
            "Light breaths with a rest after each exhale.",
        ),
        pattern(
            "gentle",
            "Gentle Warm-up",
            [3.0, 5.0, 3.0, 0.0],
            "An easier 3-5-3 rhythm to ease into longer holds.",
        ),
    ]
}

fn builtin_presets() -> Vec<PurposePreset> {
    let by_id = |id: &str| {
        builtin_patterns()
            .into_iter()
            .find(|p| p.id == id)
            .unwrap_or_else(|| pattern(id, id, [4.0, 0.0, 4.0, 0.0], ""))
    };

    vec![
        PurposePreset {
            id: "sleep".into(),
            name: "Fall Asleep".into(),
            description: "Slow 4-7-8 breathing with soft tones before bed.".into(),
            icon: "moon".into(),
            pattern: by_id("4-7-8"),
            duration_min: 10,
            sound_profile: Some(SoundProfile::SoftTones),
            ambient_sound: Some(AmbientSound::Rain),
            ramp: None,
        },
        PurposePreset {
            id: "anxiety".into(),
            name: "Ease Anxiety".into(),
            description: "Long exhales to bring the heart rate down.".into(),
            icon: "leaf".into(),
            pattern: by_id("7-11"),
            duration_min: 5,
            sound_profile: Some(SoundProfile::SingingBowl),
            ambient_sound: Some(AmbientSound::Ocean),
            ramp: None,
        },
        PurposePreset {
            id: "focus".into(),
            name: "Sharpen Focus".into(),
            description: "Box breathing before deep work.".into(),
            icon: "target".into(),
            pattern: by_id("box"),
            duration_min: 5,
            sound_profile: Some(SoundProfile::Bells),
            ambient_sound: None,
            ramp: None,
        },
        PurposePreset {
            id: "energy".into(),
            name: "Wake Up".into(),
            description: "A quick, lively rhythm for the morning.".into(),
            icon: "sun".into(),
            pattern: by_id("awake"),
            duration_min: 3,
            sound_profile: Some(SoundProfile::Bells),
            ambient_sound: Some(AmbientSound::Forest),
            ramp: None,
        },
        PurposePreset {
            id: "balance".into(),
            name: "Find Balance".into(),
            description: "Coherent breathing at about five breaths a minute.".into(),
            icon: "wave".into(),
            pattern: by_id("coherence"),
            duration_min: 10,
            sound_profile: Some(SoundProfile::Nature),
            ambient_sound: Some(AmbientSound::Wind),
            ramp: None,
        },
        PurposePreset {
            id: "wind-down".into(),
            name: "Wind Down".into(),
            description: "Start gently and build up to full 4-7-8 breathing.".into(),
            icon: "sunset".into(),
            pattern: by_id("4-7-8"),
            duration_min: 8,
            sound_profile: Some(SoundProfile::SingingBowl),
            ambient_sound: Some(AmbientSound::Fireplace),
            ramp: Some(RampConfig {
                enabled: true,
                start_pattern: by_id("gentle"),
                end_pattern: by_id("4-7-8"),
                ramp_duration_secs: 120.0,
            }),
        },
    ]
}
