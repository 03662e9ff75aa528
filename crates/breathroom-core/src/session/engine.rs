//! Breathing session engine.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` periodically
//! (see [`SessionRunner`](crate::runner::SessionRunner)).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Countdown -> Running <-> Paused
//!                      Running -> Complete
//! any non-idle state -> (stop) -> Idle
//! ```
//!
//! Elapsed time is never accumulated tick by tick. It is re-derived on every
//! tick as `now - session_started_at - paused_total`, so a tick that arrives
//! late (throttled timer, suspended process) lands on exactly the state a
//! continuously ticking engine would be in.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(settings, clock, CueDispatcher::silent())?;
//! engine.start();
//! // In a loop:
//! for event in engine.tick() { /* ... */ }
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};
use uuid::Uuid;

use super::phase;
use super::settings::SessionSettings;
use super::state::{SessionState, SessionStatus};
use crate::clock::Clock;
use crate::cue::{CueDispatcher, CueSettings};
use crate::error::{ClockError, CoreError, SessionError};
use crate::events::Event;
use crate::pattern::Phase;

type CompletionCallback = Box<dyn FnMut(u32) + Send>;

/// Core session engine. One session at a time.
pub struct SessionEngine {
    settings: SessionSettings,
    clock: Arc<dyn Clock>,
    cues: CueDispatcher,
    on_complete: Option<CompletionCallback>,
    status: SessionStatus,
    /// Clock reading when the countdown began.
    countdown_started_ms: Option<u64>,
    /// Last whole second announced during the countdown.
    countdown_announced: Option<u32>,
    /// Clock reading at which session time is zero.
    started_ms: Option<u64>,
    paused_at_ms: Option<u64>,
    paused_total_ms: u64,
    /// Phase seen by the previous derivation, `None` before the first one.
    last_phase: Option<Phase>,
    view: SessionState,
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("status", &self.status)
            .field("settings", &self.settings)
            .field("clock", &self.clock)
            .field("cues", &self.cues)
            .field("started_ms", &self.started_ms)
            .field("paused_at_ms", &self.paused_at_ms)
            .field("paused_total_ms", &self.paused_total_ms)
            .finish_non_exhaustive()
    }
}

impl SessionEngine {
    /// Create an idle engine.
    ///
    /// # Errors
    /// Returns an error if the settings are invalid. Nothing is ticking yet.
    pub fn new(
        settings: SessionSettings,
        clock: Arc<dyn Clock>,
        cues: CueDispatcher,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let view = SessionState::initial(&settings);
        Ok(Self {
            settings,
            clock,
            cues,
            on_complete: None,
            status: SessionStatus::Idle,
            countdown_started_ms: None,
            countdown_announced: None,
            started_ms: None,
            paused_at_ms: None,
            paused_total_ms: 0,
            last_phase: None,
            view,
        })
    }

    /// Register the callback invoked once per natural completion.
    pub fn on_complete(&mut self, callback: impl FnMut(u32) + Send + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn phase(&self) -> Phase {
        self.view.phase
    }

    pub fn breath_count(&self) -> u32 {
        self.view.breath_count
    }

    pub fn cue_failures(&self) -> u64 {
        self.cues.failure_count()
    }

    /// State as of the last tick or command.
    pub fn snapshot(&self) -> SessionState {
        self.view.clone()
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Replace the session inputs.
    ///
    /// # Errors
    /// Fails while a session is active or when the settings are invalid.
    pub fn configure(&mut self, settings: SessionSettings) -> Result<(), CoreError> {
        if self.status.is_active() {
            return Err(SessionError::SessionActive {
                status: self.status.to_string(),
            }
            .into());
        }
        settings.validate()?;
        self.view = SessionState::initial(&settings);
        self.settings = settings;
        self.status = SessionStatus::Idle;
        Ok(())
    }

    /// Update sound/haptic preferences; applies from the next cue on.
    pub fn set_cue_settings(&mut self, settings: CueSettings) {
        self.cues.set_settings(settings);
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh session from `Idle` or `Complete`.
    ///
    /// With a zero countdown the session goes straight to `Running`.
    pub fn start(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.status.is_active() {
            debug!(status = %self.status, "start ignored: session already active");
            return events;
        }
        let now = match self.clock.now_ms() {
            Ok(now) => now,
            Err(e) => {
                self.abort_with(&mut events, e.to_string());
                return events;
            }
        };

        self.clear_anchors();
        let session_id = Uuid::new_v4();
        self.view = SessionState::initial(&self.settings);
        self.view.session_id = Some(session_id);
        self.status = SessionStatus::Countdown;
        self.view.status = SessionStatus::Countdown;
        self.countdown_started_ms = Some(now);
        debug!(%session_id, pattern = %self.settings.pattern.id, "session started");

        self.emit(
            &mut events,
            Event::SessionStarted {
                session_id,
                pattern_id: self.settings.pattern.id.clone(),
                total_duration_secs: self.settings.total_duration_secs,
                countdown_secs: self.settings.countdown_secs,
                at: Utc::now(),
            },
        );
        self.advance_countdown(now, &mut events);
        if self.status == SessionStatus::Running {
            self.advance_running(now, &mut events);
        }
        events
    }

    pub fn pause(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.status != SessionStatus::Running {
            return events;
        }
        let Some(now) = self.read_clock(&mut events) else {
            return events;
        };
        // Bring the view up to the pause instant; this may finish the session.
        self.advance_running(now, &mut events);
        if self.status != SessionStatus::Running {
            return events;
        }
        self.paused_at_ms = Some(now);
        self.status = SessionStatus::Paused;
        self.view.status = SessionStatus::Paused;
        self.emit(
            &mut events,
            Event::SessionPaused {
                total_elapsed_secs: self.view.total_elapsed_secs,
                at: Utc::now(),
            },
        );
        events
    }

    pub fn resume(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.status != SessionStatus::Paused {
            return events;
        }
        let Some(now) = self.read_clock(&mut events) else {
            return events;
        };
        let paused_ms = self
            .paused_at_ms
            .take()
            .map(|at| now.saturating_sub(at))
            .unwrap_or(0);
        self.paused_total_ms = self.paused_total_ms.saturating_add(paused_ms);
        self.status = SessionStatus::Running;
        self.view.status = SessionStatus::Running;
        self.emit(
            &mut events,
            Event::SessionResumed {
                paused_ms,
                total_elapsed_secs: self.view.total_elapsed_secs,
                at: Utc::now(),
            },
        );
        self.advance_running(now, &mut events);
        events
    }

    /// End the session and return to `Idle`. No-op when already idle.
    pub fn stop(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.status == SessionStatus::Idle {
            return events;
        }
        let breath_count = self.view.breath_count;
        let total_elapsed_secs = self.view.total_elapsed_secs;
        self.reset_to_idle();
        debug!(breath_count, total_elapsed_secs, "session stopped");
        self.emit(
            &mut events,
            Event::SessionStopped {
                breath_count,
                total_elapsed_secs,
                at: Utc::now(),
            },
        );
        events
    }

    /// End the session because something outside the engine failed.
    pub fn abort(&mut self, reason: impl Into<String>) -> Vec<Event> {
        let mut events = Vec::new();
        if self.status.is_active() {
            self.abort_with(&mut events, reason.into());
        }
        events
    }

    /// Call periodically. Re-derives the whole state from the clock.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.status.is_ticking() {
            return events;
        }
        let Some(now) = self.read_clock(&mut events) else {
            return events;
        };
        if self.status == SessionStatus::Countdown {
            self.advance_countdown(now, &mut events);
        }
        if self.status == SessionStatus::Running {
            self.advance_running(now, &mut events);
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn advance_countdown(&mut self, now: u64, events: &mut Vec<Event>) {
        let started = *self.countdown_started_ms.get_or_insert(now);
        let countdown_ms = u64::from(self.settings.countdown_secs) * 1000;
        let elapsed = now.saturating_sub(started);

        if elapsed >= countdown_ms {
            // Anchor at the end of the countdown, not at this (possibly late) tick.
            self.begin_running(started + countdown_ms, events);
            return;
        }

        let remaining = u32::try_from((countdown_ms - elapsed).div_ceil(1000)).unwrap_or(u32::MAX);
        self.view.countdown_remaining_secs = remaining;
        if self.countdown_announced != Some(remaining) {
            self.countdown_announced = Some(remaining);
            self.cues.countdown_tick(remaining);
            self.emit(
                events,
                Event::CountdownTick {
                    remaining_secs: remaining,
                    at: Utc::now(),
                },
            );
        }
    }

    fn begin_running(&mut self, anchor_ms: u64, events: &mut Vec<Event>) {
        self.status = SessionStatus::Running;
        self.view.status = SessionStatus::Running;
        self.view.countdown_remaining_secs = 0;
        self.started_ms = Some(anchor_ms);
        self.paused_total_ms = 0;
        self.last_phase = None;
        self.cues.session_start();
        let session_id = self.view.session_id.unwrap_or_else(Uuid::new_v4);
        self.emit(
            events,
            Event::SessionRunning {
                session_id,
                at: Utc::now(),
            },
        );
    }

    fn advance_running(&mut self, now: u64, events: &mut Vec<Event>) {
        let started = *self.started_ms.get_or_insert(now);
        let elapsed_ms = now
            .saturating_sub(started)
            .saturating_sub(self.paused_total_ms);
        self.apply_elapsed(elapsed_ms as f64 / 1000.0, events);
    }

    fn apply_elapsed(&mut self, elapsed_secs: f64, events: &mut Vec<Event>) {
        let total = self.settings.total_duration_secs;
        let elapsed = elapsed_secs.clamp(0.0, total);
        let frame = self.settings.frame_at(elapsed);
        let reading = phase::locate(&frame.pattern, frame.cycle_clock);

        let previous_breaths = self.view.breath_count;
        let completed = frame.cycles.floor().max(0.0) as u32;
        let breaths = completed.max(previous_breaths);
        let crossed = breaths > previous_breaths;

        self.view.total_elapsed_secs = elapsed;
        self.view.total_time_remaining_secs = (total - elapsed).max(0.0);
        self.view.phase = reading.phase;
        self.view.phase_elapsed_secs = reading.phase_elapsed_secs;
        self.view.phase_time_remaining_secs = reading.phase_time_remaining_secs;
        self.view.phase_progress = reading.phase_progress;
        self.view.ramp_progress = frame.ramp_progress;
        self.view.breath_count = breaths;

        if crossed {
            self.emit(
                events,
                Event::BreathCompleted {
                    breath_count: breaths,
                    at: Utc::now(),
                },
            );
        }

        if crossed || self.last_phase != Some(reading.phase) {
            self.last_phase = Some(reading.phase);
            self.cues.phase_enter(reading.phase, &frame.pattern);
            self.emit(
                events,
                Event::PhaseEntered {
                    phase: reading.phase,
                    phase_duration_secs: reading.phase_duration_secs,
                    breath_count: breaths,
                    at: Utc::now(),
                },
            );
        }
        self.view.current_pattern = frame.pattern;

        if elapsed >= total {
            self.complete(events);
        }
    }

    fn complete(&mut self, events: &mut Vec<Event>) {
        let breath_count = self.view.breath_count;
        self.status = SessionStatus::Complete;
        self.view.status = SessionStatus::Complete;
        self.paused_at_ms = None;
        debug!(breath_count, "session complete");

        self.cues.session_complete(breath_count);
        if let Some(callback) = self.on_complete.as_mut() {
            callback(breath_count);
        }
        let session_id = self.view.session_id.unwrap_or_else(Uuid::new_v4);
        self.emit(
            events,
            Event::SessionCompleted {
                session_id,
                breath_count,
                total_elapsed_secs: self.view.total_elapsed_secs,
                at: Utc::now(),
            },
        );
    }

    /// Read the clock, aborting the session if it fails or runs backwards.
    fn read_clock(&mut self, events: &mut Vec<Event>) -> Option<u64> {
        let result = self.clock.now_ms().and_then(|now| {
            let anchor = [self.countdown_started_ms, self.started_ms, self.paused_at_ms]
                .into_iter()
                .flatten()
                .max()
                .unwrap_or(0);
            if now < anchor {
                Err(ClockError::WentBackwards {
                    now_ms: now,
                    anchor_ms: anchor,
                })
            } else {
                Ok(now)
            }
        });
        match result {
            Ok(now) => Some(now),
            Err(e) => {
                self.abort_with(events, e.to_string());
                None
            }
        }
    }

    fn abort_with(&mut self, events: &mut Vec<Event>, reason: String) {
        error!(%reason, status = %self.status, "session aborted");
        self.reset_to_idle();
        self.view.abort_reason = Some(reason.clone());
        self.emit(
            events,
            Event::SessionAborted {
                reason,
                at: Utc::now(),
            },
        );
    }

    fn reset_to_idle(&mut self) {
        self.status = SessionStatus::Idle;
        self.clear_anchors();
        self.view = SessionState::initial(&self.settings);
    }

    fn clear_anchors(&mut self) {
        self.countdown_started_ms = None;
        self.countdown_announced = None;
        self.started_ms = None;
        self.paused_at_ms = None;
        self.paused_total_ms = 0;
        self.last_phase = None;
    }

    fn emit(&mut self, events: &mut Vec<Event>, event: Event) {
        self.cues.lifecycle(&event);
        events.push(event);
    }
}
