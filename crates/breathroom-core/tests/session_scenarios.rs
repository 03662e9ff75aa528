//! Integration tests for whole breathing sessions.
//!
//! Every test drives a real `SessionEngine` against a `ManualClock`, ticking
//! the way a UI timer would, and checks the state a user would see.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use breathroom_core::cue::{CueRecord, PhaseCue, RecordingCueSink};
use breathroom_core::ramp::RampConfig;
use breathroom_core::session::{simulate, SimulationStep};
use breathroom_core::{
    BreathPattern, CueDispatcher, CueError, CueSettings, CueSink, Event, ManualClock,
    PatternLibrary, Phase, SessionEngine, SessionSettings, SessionState, SessionStatus,
};

const TICK_MS: u64 = 100;

fn library() -> PatternLibrary {
    PatternLibrary::builtin().unwrap()
}

fn relax_settings(total: f64) -> SessionSettings {
    let pattern = library().get("4-7-8").unwrap().clone();
    SessionSettings::new(pattern, total).with_countdown(0)
}

fn engine_with(settings: SessionSettings, cues: CueDispatcher) -> (SessionEngine, ManualClock) {
    let clock = ManualClock::new();
    let engine = SessionEngine::new(settings, Arc::new(clock.clone()), cues).unwrap();
    (engine, clock)
}

fn engine(settings: SessionSettings) -> (SessionEngine, ManualClock) {
    engine_with(settings, CueDispatcher::silent())
}

/// Advance the clock `ms` in UI-sized ticks, collecting events.
fn run_for(engine: &mut SessionEngine, clock: &ManualClock, ms: u64) -> Vec<Event> {
    let mut events = Vec::new();
    let mut left = ms;
    while left > 0 {
        let step = left.min(TICK_MS);
        clock.advance_ms(step);
        left -= step;
        events.extend(engine.tick());
    }
    events
}

fn entered_phases(events: &[Event]) -> Vec<Phase> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::PhaseEntered { phase, .. } => Some(*phase),
            _ => None,
        })
        .collect()
}

fn phase_rank(phase: Phase) -> u8 {
    match phase {
        Phase::Inhale => 0,
        Phase::Hold1 => 1,
        Phase::Exhale => 2,
        Phase::Hold2 => 3,
    }
}

fn ramp_settings(from: &str, to: &str, total: f64) -> SessionSettings {
    let lib = library();
    let target = lib.get(to).unwrap().clone();
    let ramp = RampConfig::new(lib.get(from).unwrap().clone(), target.clone(), 30.0).unwrap();
    SessionSettings::new(target, total).with_countdown(0).with_ramp(ramp)
}

/// Fields a user can see, without the per-session id.
fn visible(state: &SessionState) -> (SessionStatus, Phase, u32, f64, f64) {
    (
        state.status,
        state.phase,
        state.breath_count,
        state.total_elapsed_secs,
        state.phase_elapsed_secs,
    )
}

#[test]
fn test_basic_478_session_completes_with_three_breaths() {
    let (mut engine, clock) = engine(relax_settings(60.0));
    let completed = Arc::new(Mutex::new(Vec::new()));
    let sink = completed.clone();
    engine.on_complete(move |n| sink.lock().unwrap().push(n));

    let mut events = engine.start();
    events.extend(run_for(&mut engine, &clock, 61_000));

    let snap = engine.snapshot();
    assert_eq!(snap.status, SessionStatus::Complete);
    assert_eq!(snap.breath_count, 3);
    assert_eq!(snap.total_elapsed_secs, 60.0);
    assert_eq!(snap.total_time_remaining_secs, 0.0);
    assert_eq!(*completed.lock().unwrap(), vec![3]);

    // Zero-length hold2 is never entered.
    let phases = entered_phases(&events);
    assert!(!phases.contains(&Phase::Hold2));
    let expected = [Phase::Inhale, Phase::Hold1, Phase::Exhale];
    for (i, phase) in phases.iter().enumerate() {
        assert_eq!(*phase, expected[i % 3], "phase #{i} out of order");
    }

    let breath_events: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            Event::BreathCompleted { breath_count, .. } => Some(*breath_count),
            _ => None,
        })
        .collect();
    assert_eq!(breath_events, vec![1, 2, 3]);
}

#[test]
fn test_pause_resume_is_neutral() {
    let (mut engine, clock) = engine(relax_settings(60.0));
    engine.start();
    run_for(&mut engine, &clock, 10_000);

    engine.pause();
    let paused = engine.snapshot();
    clock.advance_secs(5);
    assert!(engine.tick().is_empty());
    assert_eq!(visible(&engine.snapshot()).3, paused.total_elapsed_secs);

    let resumed = engine.resume();
    assert!(resumed
        .iter()
        .any(|e| matches!(e, Event::SessionResumed { paused_ms: 5_000, .. })));
    run_for(&mut engine, &clock, 50_000);

    let snap = engine.snapshot();
    assert_eq!(clock.current_ms(), 65_000);
    assert_eq!(snap.status, SessionStatus::Complete);
    assert_eq!(snap.total_elapsed_secs, 60.0);
    assert_eq!(snap.breath_count, 3);
}

#[test]
fn test_ramp_session_morphs_then_holds_target() {
    let lib = library();
    let ramp = RampConfig::new(
        lib.get("gentle").unwrap().clone(),
        lib.get("4-7-8").unwrap().clone(),
        30.0,
    )
    .unwrap();
    let settings = relax_settings(90.0).with_ramp(ramp);
    let (mut engine, clock) = engine(settings);

    engine.start();
    let first = engine.snapshot().current_pattern;
    assert_eq!((first.inhale, first.hold1, first.exhale), (3.0, 5.0, 3.0));

    let mut previous_cycle = first.cycle_duration();
    for _ in 0..150 {
        run_for(&mut engine, &clock, TICK_MS);
        let cycle = engine.snapshot().current_pattern.cycle_duration();
        assert!(cycle >= previous_cycle - 1e-9, "cycle shrank during ramp");
        previous_cycle = cycle;
    }

    let mid = engine.snapshot();
    assert_eq!(mid.total_elapsed_secs, 15.0);
    assert!((mid.current_pattern.inhale - 3.5).abs() < 1e-9);
    assert!((mid.current_pattern.hold1 - 6.0).abs() < 1e-9);
    assert!((mid.current_pattern.exhale - 5.5).abs() < 1e-9);
    assert!((mid.ramp_progress - 0.5).abs() < 1e-9);

    run_for(&mut engine, &clock, 15_000);
    let target = library().get("4-7-8").unwrap().clone();
    for _ in 0..60 {
        let snap = engine.snapshot();
        assert!(snap.current_pattern.same_timings(&target));
        assert_eq!(snap.ramp_progress, 1.0);
        run_for(&mut engine, &clock, 1_000);
    }

    run_for(&mut engine, &clock, 1_000);
    assert_eq!(engine.status(), SessionStatus::Complete);
}

#[test]
fn test_ramp_breath_count_follows_inhale_entries() {
    for (from, to) in [("gentle", "4-7-8"), ("box", "coherence")] {
        for tick_ms in [16u64, 100, 250, 1_000] {
            let (mut engine, clock) = engine(ramp_settings(from, to, 90.0));
            let mut events = engine.start();
            while engine.status().is_ticking() {
                clock.advance_ms(tick_ms);
                events.extend(engine.tick());
                let inhales = entered_phases(&events)
                    .iter()
                    .filter(|p| **p == Phase::Inhale)
                    .count() as u32;
                assert_eq!(
                    engine.snapshot().breath_count + 1,
                    inhales,
                    "{from}->{to} at {tick_ms}ms, t={}ms",
                    clock.current_ms()
                );
            }

            let phases = entered_phases(&events);
            assert_eq!(phases[0], Phase::Inhale);
            for pair in phases.windows(2) {
                assert!(
                    pair[1] == Phase::Inhale || phase_rank(pair[1]) > phase_rank(pair[0]),
                    "{from}->{to} at {tick_ms}ms stepped {:?} -> {:?}",
                    pair[0],
                    pair[1]
                );
            }
            assert_eq!(engine.status(), SessionStatus::Complete);
        }
    }
}

#[test]
fn test_late_tick_across_ramp_lands_on_steady_state() {
    let (mut steady, steady_clock) = engine(ramp_settings("gentle", "4-7-8", 90.0));
    let (mut late, late_clock) = engine(ramp_settings("gentle", "4-7-8", 90.0));

    steady.start();
    run_for(&mut steady, &steady_clock, 40_000);

    late.start();
    run_for(&mut late, &late_clock, 5_000);
    late_clock.advance_secs(35);
    let events = late.tick();

    let snap = late.snapshot();
    assert_eq!(visible(&snap), visible(&steady.snapshot()));
    assert_eq!(snap.ramp_progress, 1.0);
    assert!(snap.breath_count >= 2);

    // One catch-up event carrying the final count, never a recount.
    let breaths: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            Event::BreathCompleted { breath_count, .. } => Some(*breath_count),
            _ => None,
        })
        .collect();
    assert_eq!(breaths, vec![snap.breath_count]);
}

#[test]
fn test_rapid_pause_resume_matches_continuous_run() {
    for cycles in [20u64, 50, 100] {
        let (mut choppy, choppy_clock) = engine(relax_settings(600.0));
        let (mut steady, steady_clock) = engine(relax_settings(600.0));

        choppy.start();
        let mut paused_events = 0;
        for _ in 0..cycles {
            run_for(&mut choppy, &choppy_clock, 200);
            paused_events += choppy
                .pause()
                .iter()
                .filter(|e| matches!(e, Event::SessionPaused { .. }))
                .count();
            choppy_clock.advance_ms(300);
            choppy.resume();
        }

        steady.start();
        run_for(&mut steady, &steady_clock, cycles * 200);

        assert_eq!(paused_events as u64, cycles);
        assert_eq!(
            visible(&choppy.snapshot()),
            visible(&steady.snapshot()),
            "{cycles} pause/resume cycles drifted"
        );
        assert_eq!(choppy_clock.current_ms(), cycles * 500);
    }
}

#[test]
fn test_backgrounded_tab_catches_up_in_one_tick() {
    let (mut engine, clock) = engine(relax_settings(600.0));
    engine.start();
    run_for(&mut engine, &clock, 1_000);

    clock.advance_secs(40);
    let events = engine.tick();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::BreathCompleted { breath_count: 2, .. })));

    let snap = engine.snapshot();
    assert_eq!(snap.breath_count, 2);
    assert_eq!(snap.phase, Phase::Inhale);
    assert!((snap.phase_elapsed_secs - 3.0).abs() < 1e-9);
}

#[test]
fn test_background_past_end_completes_capped() {
    let (mut engine, clock) = engine(relax_settings(60.0));
    engine.start();
    clock.advance_secs(600);
    let events = engine.tick();

    assert!(events.iter().any(Event::is_terminal));
    let snap = engine.snapshot();
    assert_eq!(snap.status, SessionStatus::Complete);
    assert_eq!(snap.total_elapsed_secs, 60.0);
    assert_eq!(snap.breath_count, 3);
}

#[test]
fn test_stop_is_idempotent_and_restart_is_fresh() {
    let (mut engine, clock) = engine(relax_settings(60.0));
    engine.start();
    let first_id = engine.snapshot().session_id;
    run_for(&mut engine, &clock, 25_000);

    let stopped = engine.stop();
    assert!(matches!(
        stopped.as_slice(),
        [Event::SessionStopped { breath_count: 1, .. }]
    ));
    assert!(engine.stop().is_empty());
    assert_eq!(engine.status(), SessionStatus::Idle);

    clock.advance_secs(30);
    assert!(engine.tick().is_empty());

    engine.start();
    let snap = engine.snapshot();
    assert_ne!(snap.session_id, first_id);
    assert_eq!(snap.breath_count, 0);
    assert_eq!(snap.total_elapsed_secs, 0.0);
}

#[test]
fn test_countdown_precedes_session_time() {
    let settings = relax_settings(60.0).with_countdown(3);
    let (mut engine, clock) = engine(settings);

    let mut events = engine.start();
    assert_eq!(engine.status(), SessionStatus::Countdown);
    assert_eq!(engine.snapshot().countdown_remaining_secs, 3);

    // Pause is ignored during the countdown.
    assert!(engine.pause().is_empty());

    events.extend(run_for(&mut engine, &clock, 3_000));
    assert_eq!(engine.status(), SessionStatus::Running);
    assert_eq!(engine.snapshot().total_elapsed_secs, 0.0);

    let ticks: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            Event::CountdownTick { remaining_secs, .. } => Some(*remaining_secs),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![3, 2, 1]);

    run_for(&mut engine, &clock, 60_000);
    assert_eq!(engine.status(), SessionStatus::Complete);
    assert_eq!(clock.current_ms(), 63_000);
}

#[derive(Debug)]
struct BrokenSpeaker;

impl CueSink for BrokenSpeaker {
    fn phase_enter(&mut self, _cue: &PhaseCue<'_>) -> Result<(), CueError> {
        Err(CueError::AudioUnavailable("device unplugged".into()))
    }

    fn session_complete(&mut self, _breath_count: u32, _volume: f64) -> Result<(), CueError> {
        Err(CueError::AudioUnavailable("device unplugged".into()))
    }
}

#[test]
fn test_failing_cues_do_not_affect_timing() {
    let cues = CueDispatcher::new(CueSettings::default(), Box::new(BrokenSpeaker));
    let (mut failing, failing_clock) = engine_with(relax_settings(60.0), cues);
    let (mut quiet, quiet_clock) = engine(relax_settings(60.0));

    failing.start();
    quiet.start();
    for _ in 0..300 {
        run_for(&mut failing, &failing_clock, 200);
        run_for(&mut quiet, &quiet_clock, 200);
        assert_eq!(visible(&failing.snapshot()), visible(&quiet.snapshot()));
    }

    assert_eq!(failing.status(), SessionStatus::Complete);
    assert!(failing.cue_failures() > 0);
}

struct CrashingSpeaker;

impl CueSink for CrashingSpeaker {
    fn phase_enter(&mut self, _cue: &PhaseCue<'_>) -> Result<(), CueError> {
        panic!("audio driver crashed");
    }
}

#[test]
fn test_panicking_cue_sink_does_not_affect_timing() {
    let cues = CueDispatcher::new(CueSettings::default(), Box::new(CrashingSpeaker));
    let (mut crashing, crashing_clock) = engine_with(relax_settings(60.0), cues);
    let (mut quiet, quiet_clock) = engine(relax_settings(60.0));

    crashing.start();
    quiet.start();
    for _ in 0..300 {
        run_for(&mut crashing, &crashing_clock, 200);
        run_for(&mut quiet, &quiet_clock, 200);
        assert_eq!(visible(&crashing.snapshot()), visible(&quiet.snapshot()));
    }

    assert_eq!(crashing.status(), SessionStatus::Complete);
    // One failed phase sound per phase entered: three full breaths plus the inhale at 57s.
    assert_eq!(crashing.cue_failures(), 10);
}

#[test]
fn test_cue_settings_change_mid_session() {
    let (sink, log) = RecordingCueSink::new();
    let (mut engine, clock) = engine_with(
        relax_settings(60.0),
        CueDispatcher::new(CueSettings::default(), Box::new(sink)),
    );

    engine.start();
    run_for(&mut engine, &clock, 5_000);
    assert_eq!(log.phases(), vec![Phase::Inhale, Phase::Hold1]);

    engine.set_cue_settings(CueSettings {
        mute_hold_phases: true,
        ..CueSettings::default()
    });
    run_for(&mut engine, &clock, 24_000);
    assert_eq!(
        log.phases(),
        vec![Phase::Inhale, Phase::Hold1, Phase::Exhale, Phase::Inhale]
    );
    assert_eq!(engine.snapshot().phase, Phase::Hold1);
}

#[test]
fn test_mute_hold_phases_skips_hold_sounds() {
    let (sink, log) = RecordingCueSink::new();
    let settings = CueSettings {
        mute_hold_phases: true,
        ..CueSettings::default()
    };
    let (mut engine, clock) = engine_with(
        relax_settings(60.0),
        CueDispatcher::new(settings, Box::new(sink)),
    );

    engine.start();
    run_for(&mut engine, &clock, 19_000);
    let phases = log.phases();
    assert_eq!(phases, vec![Phase::Inhale, Phase::Exhale, Phase::Inhale]);
}

#[test]
fn test_clock_failure_aborts_once() {
    let (mut engine, clock) = engine(relax_settings(60.0));
    engine.start();
    run_for(&mut engine, &clock, 5_000);

    clock.fail();
    let events = engine.tick();
    assert!(matches!(events.as_slice(), [Event::SessionAborted { .. }]));
    let snap = engine.snapshot();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert!(snap.abort_reason.is_some());

    assert!(engine.tick().is_empty());
    clock.recover();
    assert!(engine.tick().is_empty());
}

#[test]
fn test_settings_are_rejected_not_clamped() {
    let pattern = BreathPattern::new("p", "P", 4.0, 0.0, 4.0, 0.0).unwrap();
    for total in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        let settings = SessionSettings::new(pattern.clone(), total);
        let result = SessionEngine::new(
            settings,
            Arc::new(ManualClock::new()),
            CueDispatcher::silent(),
        );
        assert!(result.is_err(), "total {total} accepted");
    }
}

#[test]
fn test_simulation_matches_manual_driving() {
    let report = simulate(
        relax_settings(60.0),
        &[
            SimulationStep::Run(Duration::from_secs(10)),
            SimulationStep::Pause(Duration::from_secs(5)),
            SimulationStep::RunToEnd,
        ],
        Duration::from_millis(TICK_MS),
    )
    .unwrap();

    assert_eq!(report.wall_clock_ms, 65_000);
    assert_eq!(report.completed_with, Some(3));
    assert_eq!(report.final_state.total_elapsed_secs, 60.0);
    assert_eq!(report.events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(!report.cues.is_empty());
}

#[test]
fn test_simulated_pause_waits_for_countdown() {
    let report = simulate(
        relax_settings(60.0).with_countdown(3),
        &[
            SimulationStep::Run(Duration::from_secs(2)),
            SimulationStep::Pause(Duration::from_secs(5)),
            SimulationStep::RunToEnd,
        ],
        Duration::from_millis(TICK_MS),
    )
    .unwrap();

    let paused: Vec<f64> = report
        .events
        .iter()
        .filter_map(|e| match e {
            Event::SessionPaused {
                total_elapsed_secs, ..
            } => Some(*total_elapsed_secs),
            _ => None,
        })
        .collect();
    assert_eq!(paused, vec![2.0]);
    assert_eq!(report.wall_clock_ms, 68_000);
    assert_eq!(report.completed_with, Some(3));
    assert_eq!(report.final_state.total_elapsed_secs, 60.0);
}

#[test]
fn test_simulated_background_catches_up() {
    let report = simulate(
        relax_settings(600.0),
        &[
            SimulationStep::Run(Duration::from_secs(1)),
            SimulationStep::Background(Duration::from_secs(40)),
        ],
        Duration::from_millis(TICK_MS),
    )
    .unwrap();

    let snap = &report.final_state;
    assert_eq!(report.wall_clock_ms, 41_000);
    assert_eq!(snap.status, SessionStatus::Running);
    assert_eq!(snap.breath_count, 2);
    assert_eq!(snap.phase, Phase::Inhale);
    assert!((snap.phase_elapsed_secs - 3.0).abs() < 1e-9);
    assert!(report
        .events
        .iter()
        .all(|e| !matches!(e, Event::SessionPaused { .. })));

    // The backgrounded stretch produced one catch-up phase sound, not one per missed phase.
    let inhale_sounds = report
        .cues
        .iter()
        .filter(|c| matches!(c, CueRecord::PhaseSound { phase: Phase::Inhale, .. }))
        .count();
    assert_eq!(inhale_sounds, 2);
}
