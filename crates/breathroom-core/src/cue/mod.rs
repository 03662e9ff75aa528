//! Sound, haptic and ambient cues.
//!
//! The session engine talks to a single [`CueDispatcher`]. The dispatcher
//! applies the user's cue settings, forwards to the configured sinks and
//! swallows every sink failure after logging it: a broken audio backend
//! degrades a session to silent, it never stops or delays it. A sink that
//! panics is treated as a failed cue.

mod ambient;
mod recording;

pub use ambient::{AmbientController, AmbientSink};
pub use recording::{CueLog, CueRecord, NullCueSink, RecordingCueSink};

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CueError;
use crate::events::Event;
use crate::pattern::{BreathPattern, Phase};

/// Family of phase sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundProfile {
    #[default]
    Bells,
    SingingBowl,
    SoftTones,
    Nature,
}

impl SoundProfile {
    pub fn id(self) -> &'static str {
        match self {
            SoundProfile::Bells => "bells",
            SoundProfile::SingingBowl => "singing-bowl",
            SoundProfile::SoftTones => "soft-tones",
            SoundProfile::Nature => "nature",
        }
    }

    /// Sound asset key for a phase, e.g. `singing-bowl/inhale`.
    pub fn cue_key(self, phase: Phase) -> String {
        let slot = match phase {
            Phase::Inhale => "inhale",
            Phase::Hold1 | Phase::Hold2 => "hold",
            Phase::Exhale => "exhale",
        };
        format!("{}/{}", self.id(), slot)
    }
}

impl std::str::FromStr for SoundProfile {
    type Err = CueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bells" => Ok(SoundProfile::Bells),
            "singing-bowl" => Ok(SoundProfile::SingingBowl),
            "soft-tones" => Ok(SoundProfile::SoftTones),
            "nature" => Ok(SoundProfile::Nature),
            other => Err(CueError::Failed(format!("unknown sound profile '{other}'"))),
        }
    }
}

/// Vibration shapes, one per phase family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HapticPattern {
    BreathInWave,
    HoldTap,
    BreathOutWave,
}

impl HapticPattern {
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Inhale => HapticPattern::BreathInWave,
            Phase::Hold1 | Phase::Hold2 => HapticPattern::HoldTap,
            Phase::Exhale => HapticPattern::BreathOutWave,
        }
    }

    /// Alternating on/off timings in milliseconds.
    pub fn timings(self) -> &'static [u32] {
        match self {
            HapticPattern::BreathInWave => &[10, 50, 15, 45, 20, 40, 30],
            HapticPattern::HoldTap => &[15],
            HapticPattern::BreathOutWave => &[50, 20, 40, 30, 30, 40, 20],
        }
    }

    pub fn duration_ms(self) -> u32 {
        self.timings().iter().sum()
    }
}

/// Everything a sink needs to voice a phase change.
#[derive(Debug, Clone, Copy)]
pub struct PhaseCue<'a> {
    pub phase: Phase,
    pub pattern: &'a BreathPattern,
    pub profile: SoundProfile,
    /// 0.0 ..= 1.0
    pub volume: f64,
}

impl PhaseCue<'_> {
    pub fn sound_key(&self) -> String {
        self.profile.cue_key(self.phase)
    }

    pub fn phase_duration_secs(&self) -> f64 {
        self.pattern.duration_of(self.phase)
    }
}

/// Audio backend for phase and session sounds.
pub trait CueSink: Send {
    fn phase_enter(&mut self, cue: &PhaseCue<'_>) -> Result<(), CueError>;

    fn countdown_tick(&mut self, _remaining_secs: u32, _volume: f64) -> Result<(), CueError> {
        Ok(())
    }

    fn session_start(&mut self, _volume: f64) -> Result<(), CueError> {
        Ok(())
    }

    fn session_complete(&mut self, _breath_count: u32, _volume: f64) -> Result<(), CueError> {
        Ok(())
    }
}

/// Vibration backend.
pub trait HapticSink: Send {
    fn pulse(&mut self, pattern: HapticPattern) -> Result<(), CueError>;
}

/// User-facing cue preferences. Can change while a session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueSettings {
    pub sound_enabled: bool,
    /// 0.0 ..= 1.0
    pub volume: f64,
    pub sound_profile: SoundProfile,
    pub haptic_enabled: bool,
    pub mute_hold_phases: bool,
}

impl Default for CueSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            volume: 0.5,
            sound_profile: SoundProfile::default(),
            haptic_enabled: false,
            mute_hold_phases: false,
        }
    }
}

impl CueSettings {
    fn clamped_volume(&self) -> f64 {
        if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Adapter between the session engine and the cue sinks.
pub struct CueDispatcher {
    settings: CueSettings,
    sound: Box<dyn CueSink>,
    haptics: Option<Box<dyn HapticSink>>,
    ambient: Option<AmbientController>,
    failures: u64,
}

impl std::fmt::Debug for CueDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CueDispatcher")
            .field("settings", &self.settings)
            .field("haptics", &self.haptics.is_some())
            .field("ambient", &self.ambient)
            .field("failures", &self.failures)
            .finish()
    }
}

impl CueDispatcher {
    pub fn new(settings: CueSettings, sound: Box<dyn CueSink>) -> Self {
        Self {
            settings,
            sound,
            haptics: None,
            ambient: None,
            failures: 0,
        }
    }

    /// No sinks at all.
    pub fn silent() -> Self {
        Self::new(
            CueSettings {
                sound_enabled: false,
                ..CueSettings::default()
            },
            Box::new(NullCueSink),
        )
    }

    pub fn with_haptics(mut self, haptics: Box<dyn HapticSink>) -> Self {
        self.haptics = Some(haptics);
        self
    }

    pub fn with_ambient(mut self, ambient: AmbientController) -> Self {
        self.ambient = Some(ambient);
        self
    }

    pub fn set_settings(&mut self, settings: CueSettings) {
        self.settings = settings;
    }

    /// Number of sink calls that failed since construction.
    pub fn failure_count(&self) -> u64 {
        self.failures
    }

    pub fn phase_enter(&mut self, phase: Phase, pattern: &BreathPattern) {
        if phase.is_hold() && self.settings.mute_hold_phases {
            return;
        }
        if self.settings.sound_enabled {
            let cue = PhaseCue {
                phase,
                pattern,
                profile: self.settings.sound_profile,
                volume: self.settings.clamped_volume(),
            };
            let sound = &mut self.sound;
            let result = guarded(|| sound.phase_enter(&cue));
            self.record("phase sound", result);
        }
        if self.settings.haptic_enabled {
            if let Some(haptics) = self.haptics.as_mut() {
                let result = guarded(|| haptics.pulse(HapticPattern::for_phase(phase)));
                self.record("haptic pulse", result);
            }
        }
    }

    pub fn countdown_tick(&mut self, remaining_secs: u32) {
        if self.settings.sound_enabled {
            let volume = self.settings.clamped_volume();
            let sound = &mut self.sound;
            let result = guarded(|| sound.countdown_tick(remaining_secs, volume));
            self.record("countdown sound", result);
        }
    }

    pub fn session_start(&mut self) {
        if self.settings.sound_enabled {
            let volume = self.settings.clamped_volume();
            let sound = &mut self.sound;
            let result = guarded(|| sound.session_start(volume));
            self.record("session start sound", result);
        }
    }

    pub fn session_complete(&mut self, breath_count: u32) {
        if self.settings.sound_enabled {
            let volume = self.settings.clamped_volume();
            let sound = &mut self.sound;
            let result = guarded(|| sound.session_complete(breath_count, volume));
            self.record("session complete sound", result);
        }
    }

    /// Forward a lifecycle event to the ambient controller.
    pub fn lifecycle(&mut self, event: &Event) {
        if let Some(ambient) = self.ambient.as_mut() {
            let result = guarded(|| ambient.handle(event));
            self.record("ambient sound", result);
        }
    }

    fn record(&mut self, what: &str, result: Result<(), CueError>) {
        if let Err(e) = result {
            self.failures += 1;
            warn!(cue = what, error = %e, "cue dispatch failed; continuing without it");
        }
    }
}

/// Run one sink call, turning a panic into a cue error.
fn guarded(call: impl FnOnce() -> Result<(), CueError>) -> Result<(), CueError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|_| Err(CueError::Failed("cue sink panicked".into())))
}
