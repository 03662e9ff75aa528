//! Deterministic session simulation.
//!
//! Runs a real [`SessionEngine`] against a [`ManualClock`] so a whole session
//! can be replayed in microseconds with reproducible results. Used by the
//! test suite and by `breathroom-cli session simulate`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use super::{SessionEngine, SessionSettings, SessionState, SessionStatus};
use crate::clock::ManualClock;
use crate::cue::{CueDispatcher, CueRecord, CueSettings, RecordingCueSink};
use crate::error::CoreError;
use crate::events::Event;

/// One instruction in a simulation plan.
///
/// Durations are session time: the countdown plays out before the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStep {
    /// Let the clock run, ticking at the simulation interval.
    Run(Duration),
    /// Pause, let the clock run without ticking, resume.
    Pause(Duration),
    /// Let the clock run with no ticks at all, then tick once, the way a
    /// throttled background tab catches up.
    Background(Duration),
    /// Tick until the session completes.
    RunToEnd,
    Stop,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub final_state: SessionState,
    /// Clock time from `start()` to the end of the plan.
    pub wall_clock_ms: u64,
    /// Breath count handed to the completion callback, if it fired.
    pub completed_with: Option<u32>,
    pub events: Vec<Event>,
    pub cues: Vec<CueRecord>,
}

/// Run `plan` against a fresh engine.
///
/// # Errors
/// Returns an error if the settings are invalid.
pub fn simulate(
    settings: SessionSettings,
    plan: &[SimulationStep],
    tick: Duration,
) -> Result<SimulationReport, CoreError> {
    let countdown_ms = u64::from(settings.countdown_secs) * 1000;
    let clock = ManualClock::new();
    let (sink, log) = RecordingCueSink::new();
    let cues = CueDispatcher::new(CueSettings::default(), Box::new(sink));
    let mut engine = SessionEngine::new(settings, Arc::new(clock.clone()), cues)?;

    let completed = Arc::new(Mutex::new(None));
    let slot = completed.clone();
    engine.on_complete(move |count| {
        if let Ok(mut slot) = slot.lock() {
            *slot = Some(count);
        }
    });

    let tick_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX).max(1);
    let mut events = engine.start();
    run_ticks(&mut engine, &clock, countdown_ms, tick_ms, &mut events);

    for step in plan {
        match *step {
            SimulationStep::Run(duration) => {
                let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                run_ticks(&mut engine, &clock, ms, tick_ms, &mut events);
            }
            SimulationStep::Pause(duration) => {
                events.extend(engine.pause());
                clock.advance(duration);
                events.extend(engine.resume());
            }
            SimulationStep::Background(duration) => {
                clock.advance(duration);
                events.extend(engine.tick());
            }
            SimulationStep::RunToEnd => {
                while engine.status().is_ticking() {
                    clock.advance_ms(tick_ms);
                    events.extend(engine.tick());
                }
            }
            SimulationStep::Stop => events.extend(engine.stop()),
        }
        if engine.status() == SessionStatus::Complete || engine.status() == SessionStatus::Idle {
            break;
        }
    }

    let completed_with = completed.lock().ok().and_then(|c| *c);
    Ok(SimulationReport {
        final_state: engine.snapshot(),
        wall_clock_ms: clock.current_ms(),
        completed_with,
        events,
        cues: log.records(),
    })
}

fn run_ticks(
    engine: &mut SessionEngine,
    clock: &ManualClock,
    ms: u64,
    tick_ms: u64,
    events: &mut Vec<Event>,
) {
    let mut left = ms;
    while left > 0 && engine.status().is_ticking() {
        let step_ms = left.min(tick_ms);
        clock.advance_ms(step_ms);
        left -= step_ms;
        events.extend(engine.tick());
    }
}
