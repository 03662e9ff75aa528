//! Property tests for session timing invariants.

use std::sync::Arc;

use breathroom_core::ramp::{self, RampConfig};
use breathroom_core::session::locate;
use breathroom_core::{
    BreathPattern, CueDispatcher, ManualClock, SessionEngine, SessionSettings, SessionStatus,
};
use proptest::prelude::*;

fn pattern_strategy() -> impl Strategy<Value = BreathPattern> {
    (1u32..=12, 0u32..=12, 1u32..=12, 0u32..=12).prop_map(|(i, h1, e, h2)| {
        BreathPattern::new(
            "prop",
            "Prop",
            f64::from(i),
            f64::from(h1),
            f64::from(e),
            f64::from(h2),
        )
        .unwrap()
    })
}

fn running_engine(pattern: BreathPattern, total: f64) -> (SessionEngine, ManualClock) {
    let clock = ManualClock::new();
    let settings = SessionSettings::new(pattern, total).with_countdown(0);
    let mut engine =
        SessionEngine::new(settings, Arc::new(clock.clone()), CueDispatcher::silent()).unwrap();
    engine.start();
    (engine, clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn breath_count_is_whole_cycles_elapsed(
        pattern in pattern_strategy(),
        elapsed_ms in 0u64..600_000,
    ) {
        let cycle = pattern.cycle_duration();
        let (mut engine, clock) = running_engine(pattern, 3_600.0);
        clock.advance_ms(elapsed_ms);
        engine.tick();

        let elapsed = elapsed_ms as f64 / 1000.0;
        let snap = engine.snapshot();
        prop_assert_eq!(snap.breath_count, (elapsed / cycle).floor() as u32);
        prop_assert_eq!(snap.total_elapsed_secs, elapsed);
        prop_assert!(snap.phase_elapsed_secs >= 0.0);
        let phase_length = snap.current_pattern.duration_of(snap.phase);
        prop_assert!(snap.phase_elapsed_secs <= phase_length + 1e-9);
    }

    #[test]
    fn located_phase_is_never_zero_width(
        pattern in pattern_strategy(),
        fraction in 0.0f64..1.0,
    ) {
        let clock = fraction * pattern.cycle_duration();
        let reading = locate(&pattern, clock);
        prop_assert!(pattern.duration_of(reading.phase) > 0.0);
        prop_assert!((0.0..=1.0).contains(&reading.phase_progress));
    }

    #[test]
    fn pauses_do_not_count_as_session_time(
        pattern in pattern_strategy(),
        runs in proptest::collection::vec((1u64..20_000, 0u64..60_000), 1..10),
    ) {
        let (mut engine, clock) = running_engine(pattern, 3_600.0);
        let mut running_ms = 0;
        for (run, pause) in runs {
            clock.advance_ms(run);
            running_ms += run;
            engine.tick();
            engine.pause();
            clock.advance_ms(pause);
            engine.tick();
            engine.resume();
        }

        let snap = engine.snapshot();
        prop_assert_eq!(snap.status, SessionStatus::Running);
        prop_assert_eq!(snap.total_elapsed_secs, running_ms as f64 / 1000.0);
    }

    #[test]
    fn ramp_cycle_is_monotonic_towards_target(
        start in pattern_strategy(),
        end in pattern_strategy(),
        duration in 1.0f64..600.0,
        a in 0.0f64..1.2,
        b in 0.0f64..1.2,
    ) {
        let config = RampConfig::new(start.clone(), end.clone(), duration).unwrap();
        let (early, late) = if a <= b { (a, b) } else { (b, a) };
        let c_early = ramp::interpolate(&config, early * duration).pattern.cycle_duration();
        let c_late = ramp::interpolate(&config, late * duration).pattern.cycle_duration();

        if end.cycle_duration() >= start.cycle_duration() {
            prop_assert!(c_late >= c_early - 1e-9);
        } else {
            prop_assert!(c_late <= c_early + 1e-9);
        }

        let at_end = ramp::interpolate(&config, duration);
        prop_assert!(at_end.pattern.same_timings(&end));
        prop_assert_eq!(at_end.progress, 1.0);
    }

    #[test]
    fn ramp_breath_position_never_goes_backwards(
        start in pattern_strategy(),
        end in pattern_strategy(),
        duration in 1.0f64..300.0,
        t1 in 0.0f64..600.0,
        dt in 0.0f64..600.0,
    ) {
        let config = RampConfig::new(start, end, duration).unwrap();
        let p1 = ramp::cycle_position(&config, t1);
        let p2 = ramp::cycle_position(&config, t1 + dt);
        prop_assert!(p1 >= 0.0);
        prop_assert!(p2 >= p1 - 1e-9);
    }
}
