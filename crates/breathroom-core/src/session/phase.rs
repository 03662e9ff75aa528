use crate::pattern::{BreathPattern, Phase};

/// Position inside one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseReading {
    pub phase: Phase,
    pub phase_duration_secs: f64,
    pub phase_elapsed_secs: f64,
    pub phase_time_remaining_secs: f64,
    /// 0.0 ..= 1.0
    pub phase_progress: f64,
}

/// Find the phase `cycle_clock` seconds into a cycle of `pattern`.
///
/// Walks the cumulative thresholds inhale, +hold1, +exhale, +hold2. A
/// zero-width hold ends where it starts, so the clock can never land in it.
/// A clock at or past the end of the cycle (float rounding) reads as the end
/// of the last non-empty phase.
pub fn locate(pattern: &BreathPattern, cycle_clock: f64) -> PhaseReading {
    let clock = cycle_clock.max(0.0);
    let mut start = 0.0;
    let mut last = None;

    for phase in pattern.active_phases() {
        let duration = pattern.duration_of(phase);
        let end = start + duration;
        if clock < end {
            let elapsed = clock - start;
            return PhaseReading {
                phase,
                phase_duration_secs: duration,
                phase_elapsed_secs: elapsed,
                phase_time_remaining_secs: end - clock,
                phase_progress: (elapsed / duration).clamp(0.0, 1.0),
            };
        }
        last = Some((phase, duration));
        start = end;
    }

    // Exhale is always active, so `last` is set for any valid pattern.
    let (phase, duration) = last.unwrap_or((Phase::Exhale, pattern.exhale));
    PhaseReading {
        phase,
        phase_duration_secs: duration,
        phase_elapsed_secs: duration,
        phase_time_remaining_secs: 0.0,
        phase_progress: 1.0,
    }
}
