//! Breath patterns and the built-in catalog.
//!
//! A [`BreathPattern`] is four phase durations in seconds. Patterns are
//! validated whenever they are built or deserialized, so the session engine
//! only ever sees patterns with a positive inhale, a positive exhale and
//! non-negative holds.

mod library;
mod preset;

pub use library::PatternLibrary;
pub use preset::{AmbientSound, PurposePreset};

use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// One segment of a breath cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Inhale,
    /// Hold after inhale.
    Hold1,
    Exhale,
    /// Hold after exhale.
    Hold2,
}

impl Phase {
    /// Cycle order.
    pub const ALL: [Phase; 4] = [Phase::Inhale, Phase::Hold1, Phase::Exhale, Phase::Hold2];

    pub fn is_hold(self) -> bool {
        matches!(self, Phase::Hold1 | Phase::Hold2)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Inhale => "inhale",
            Phase::Hold1 => "hold1",
            Phase::Exhale => "exhale",
            Phase::Hold2 => "hold2",
        }
    }

    /// Human-facing instruction for the phase.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Inhale => "Breathe in",
            Phase::Hold1 | Phase::Hold2 => "Hold",
            Phase::Exhale => "Breathe out",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breathing pattern definition. All timings are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PatternDef")]
pub struct BreathPattern {
    pub id: String,
    pub name: String,
    pub inhale: f64,
    pub hold1: f64,
    pub exhale: f64,
    pub hold2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Unvalidated wire form of [`BreathPattern`].
#[derive(Deserialize)]
struct PatternDef {
    id: String,
    name: String,
    inhale: f64,
    #[serde(default)]
    hold1: f64,
    exhale: f64,
    #[serde(default)]
    hold2: f64,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<PatternDef> for BreathPattern {
    type Error = PatternError;

    fn try_from(def: PatternDef) -> Result<Self, Self::Error> {
        let pattern = BreathPattern {
            id: def.id,
            name: def.name,
            inhale: def.inhale,
            hold1: def.hold1,
            exhale: def.exhale,
            hold2: def.hold2,
            description: def.description,
        };
        pattern.validate()?;
        Ok(pattern)
    }
}

impl BreathPattern {
    /// Build and validate a pattern.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        inhale: f64,
        hold1: f64,
        exhale: f64,
        hold2: f64,
    ) -> Result<Self, PatternError> {
        let pattern = Self {
            id: id.into(),
            name: name.into(),
            inhale,
            hold1,
            exhale,
            hold2,
            description: None,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Check every invariant of the pattern.
    ///
    /// Fields are public, so the engine calls this again before accepting a
    /// pattern it did not build itself.
    pub fn validate(&self) -> Result<(), PatternError> {
        if self.id.trim().is_empty() {
            return Err(PatternError::EmptyId);
        }
        for phase in Phase::ALL {
            let value = self.duration_of(phase);
            if !value.is_finite() {
                return Err(PatternError::NonFinite {
                    id: self.id.clone(),
                    field: phase.as_str(),
                    value,
                });
            }
            if value < 0.0 {
                return Err(PatternError::Negative {
                    id: self.id.clone(),
                    field: phase.as_str(),
                    value,
                });
            }
        }
        // A positive inhale and exhale make the cycle positive too.
        for phase in [Phase::Inhale, Phase::Exhale] {
            if self.duration_of(phase) <= 0.0 {
                return Err(PatternError::ZeroBreath {
                    id: self.id.clone(),
                    field: phase.as_str(),
                });
            }
        }
        Ok(())
    }

    /// Duration of one phase in seconds.
    pub fn duration_of(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Inhale => self.inhale,
            Phase::Hold1 => self.hold1,
            Phase::Exhale => self.exhale,
            Phase::Hold2 => self.hold2,
        }
    }

    /// inhale + hold1 + exhale + hold2.
    pub fn cycle_duration(&self) -> f64 {
        self.inhale + self.hold1 + self.exhale + self.hold2
    }

    pub fn breaths_per_minute(&self) -> f64 {
        60.0 / self.cycle_duration()
    }

    /// Phases with a non-zero duration, in cycle order.
    pub fn active_phases(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL
            .into_iter()
            .filter(move |p| self.duration_of(*p) > 0.0)
    }

    /// True when all four timings match, ignoring id and name.
    pub fn same_timings(&self, other: &BreathPattern) -> bool {
        Phase::ALL
            .iter()
            .all(|p| self.duration_of(*p) == other.duration_of(*p))
    }

    /// Compact "4-7-8-0" rendering of the timings.
    pub fn timing_label(&self) -> String {
        Phase::ALL
            .iter()
            .map(|p| format_secs(self.duration_of(*p)))
            .collect::<Vec<_>>()
            .join("-")
    }
}

fn format_secs(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}
