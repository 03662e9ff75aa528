use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pattern::Phase;

/// Every state change of a session produces an Event.
/// The UI subscribes to them; the ambient controller reacts to the lifecycle ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        pattern_id: String,
        total_duration_secs: f64,
        countdown_secs: u32,
        at: DateTime<Utc>,
    },
    CountdownTick {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    /// Countdown finished; session time starts now.
    SessionRunning {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    PhaseEntered {
        phase: Phase,
        phase_duration_secs: f64,
        breath_count: u32,
        at: DateTime<Utc>,
    },
    BreathCompleted {
        breath_count: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        total_elapsed_secs: f64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        paused_ms: u64,
        total_elapsed_secs: f64,
        at: DateTime<Utc>,
    },
    SessionStopped {
        breath_count: u32,
        total_elapsed_secs: f64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: Uuid,
        breath_count: u32,
        total_elapsed_secs: f64,
        at: DateTime<Utc>,
    },
    /// Session ended because the clock or the tick loop failed.
    SessionAborted {
        reason: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Session is over, one way or another.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::SessionStopped { .. }
                | Event::SessionCompleted { .. }
                | Event::SessionAborted { .. }
        )
    }
}
