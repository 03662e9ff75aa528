//! Linear pattern ramp.
//!
//! A ramp morphs each of the four timings from `start_pattern` to
//! `end_pattern` over the first `ramp_duration_secs` of a session, then holds
//! `end_pattern`. Everything here is a pure function of the config and the
//! session's elapsed time.

use serde::{Deserialize, Serialize};

use crate::error::PatternError;
use crate::pattern::{BreathPattern, Phase};

/// Below this slope (seconds of cycle per second of session) the cycle is
/// treated as constant while integrating.
const FLAT_SLOPE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampConfig {
    pub enabled: bool,
    pub start_pattern: BreathPattern,
    pub end_pattern: BreathPattern,
    pub ramp_duration_secs: f64,
}

/// Pattern in effect at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub struct RampSample {
    pub pattern: BreathPattern,
    /// 0.0 ..= 1.0
    pub progress: f64,
}

impl RampConfig {
    /// Build and validate an enabled ramp.
    pub fn new(
        start_pattern: BreathPattern,
        end_pattern: BreathPattern,
        ramp_duration_secs: f64,
    ) -> Result<Self, PatternError> {
        let config = Self {
            enabled: true,
            start_pattern,
            end_pattern,
            ramp_duration_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PatternError> {
        self.start_pattern.validate()?;
        self.end_pattern.validate()?;
        if !self.ramp_duration_secs.is_finite() || self.ramp_duration_secs <= 0.0 {
            return Err(PatternError::InvalidRampDuration(self.ramp_duration_secs));
        }
        Ok(())
    }

    /// Cycle duration at `elapsed_secs`. Linear in time during the ramp.
    pub fn cycle_duration_at(&self, elapsed_secs: f64) -> f64 {
        interpolate(self, elapsed_secs).pattern.cycle_duration()
    }
}

/// Pattern and progress at `elapsed_secs` into the session.
pub fn interpolate(config: &RampConfig, elapsed_secs: f64) -> RampSample {
    if !config.enabled || elapsed_secs.is_nan() || elapsed_secs >= config.ramp_duration_secs {
        return RampSample {
            pattern: config.end_pattern.clone(),
            progress: 1.0,
        };
    }

    let progress = (elapsed_secs / config.ramp_duration_secs).clamp(0.0, 1.0);
    if progress == 0.0 {
        return RampSample {
            pattern: config.start_pattern.clone(),
            progress,
        };
    }

    let start = &config.start_pattern;
    let end = &config.end_pattern;
    let lerp = |phase: Phase| {
        let a = start.duration_of(phase);
        let b = end.duration_of(phase);
        a + (b - a) * progress
    };

    RampSample {
        pattern: BreathPattern {
            id: format!("ramp:{}:{}", start.id, end.id),
            name: format!("{} to {} ({:.0}%)", start.name, end.name, progress * 100.0),
            inhale: lerp(Phase::Inhale),
            hold1: lerp(Phase::Hold1),
            exhale: lerp(Phase::Exhale),
            hold2: lerp(Phase::Hold2),
            description: None,
        },
        progress,
    }
}

/// Fractional number of cycles completed after `elapsed_secs`.
///
/// Integrates the breathing rate `1 / cycle(t)`. While ramping the cycle
/// duration is `c0 + k*t`, so the integral is `ln(c(t) / c0) / k`; after the
/// ramp it grows linearly at `1 / c1`. The integer part is the number of
/// cycle boundaries crossed, independent of how often the caller samples it.
pub fn cycle_position(config: &RampConfig, elapsed_secs: f64) -> f64 {
    let elapsed = elapsed_secs.max(0.0);
    let c1 = config.end_pattern.cycle_duration();
    if !config.enabled {
        return elapsed / c1;
    }

    let ramp = config.ramp_duration_secs;
    let c0 = config.start_pattern.cycle_duration();
    let slope = (c1 - c0) / ramp;
    let within = elapsed.min(ramp);

    let ramped = if slope.abs() < FLAT_SLOPE {
        within / c0
    } else {
        ((c0 + slope * within) / c0).ln() / slope
    };

    if elapsed > ramp {
        ramped + (elapsed - ramp) / c1
    } else {
        ramped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gentle() -> BreathPattern {
        BreathPattern::new("gentle", "Gentle", 3.0, 5.0, 3.0, 0.0).unwrap()
    }

    fn relax() -> BreathPattern {
        BreathPattern::new("4-7-8", "Relax", 4.0, 7.0, 8.0, 0.0).unwrap()
    }

    fn ramp() -> RampConfig {
        RampConfig::new(gentle(), relax(), 30.0).unwrap()
    }

    #[test]
    fn start_of_ramp_is_start_pattern() {
        let sample = interpolate(&ramp(), 0.0);
        assert_eq!(sample.pattern, gentle());
        assert_eq!(sample.progress, 0.0);
    }

    #[test]
    fn midpoint_interpolates_each_field() {
        let sample = interpolate(&ramp(), 15.0);
        assert_eq!(sample.progress, 0.5);
        assert_eq!(sample.pattern.inhale, 3.5);
        assert_eq!(sample.pattern.hold1, 6.0);
        assert_eq!(sample.pattern.exhale, 5.5);
        assert_eq!(sample.pattern.hold2, 0.0);
        assert_eq!(sample.pattern.id, "ramp:gentle:4-7-8");
    }

    #[test]
    fn end_of_ramp_is_end_pattern() {
        for t in [30.0, 30.5, 90.0, 1e9] {
            let sample = interpolate(&ramp(), t);
            assert_eq!(sample.pattern, relax());
            assert_eq!(sample.progress, 1.0);
        }
    }

    #[test]
    fn disabled_ramp_is_end_pattern() {
        let mut cfg = ramp();
        cfg.enabled = false;
        let sample = interpolate(&cfg, 0.0);
        assert_eq!(sample.pattern, relax());
        assert_eq!(sample.progress, 1.0);
    }

    #[test]
    fn rejects_bad_duration() {
        for d in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                RampConfig::new(gentle(), relax(), d),
                Err(PatternError::InvalidRampDuration(_))
            ));
        }
    }

    #[test]
    fn cycle_position_without_ramp_is_division() {
        let mut cfg = ramp();
        cfg.enabled = false;
        assert_eq!(cycle_position(&cfg, 57.0), 3.0);
        assert_eq!(cycle_position(&cfg, 60.0).floor(), 3.0);
    }

    #[test]
    fn cycle_position_with_equal_cycles_is_division() {
        let a = BreathPattern::new("a", "A", 4.0, 0.0, 4.0, 0.0).unwrap();
        let b = BreathPattern::new("b", "B", 2.0, 2.0, 2.0, 2.0).unwrap();
        let cfg = RampConfig::new(a, b, 20.0).unwrap();
        assert!((cycle_position(&cfg, 40.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn cycle_position_matches_numeric_integration() {
        let cfg = ramp();
        let dt = 0.0005;
        let mut acc = 0.0;
        let mut t = 0.0;
        while t < 45.0 {
            acc += dt / cfg.cycle_duration_at(t + dt / 2.0);
            t += dt;
        }
        assert!((cycle_position(&cfg, 45.0) - acc).abs() < 1e-3);
    }
}
