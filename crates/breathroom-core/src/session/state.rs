use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SessionSettings;
use crate::pattern::{BreathPattern, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Countdown,
    Running,
    Paused,
    Complete,
}

impl SessionStatus {
    /// A session exists and has not ended.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionStatus::Countdown | SessionStatus::Running | SessionStatus::Paused
        )
    }

    /// States in which the tick loop has work to do.
    pub fn is_ticking(self) -> bool {
        matches!(self, SessionStatus::Countdown | SessionStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Countdown => "countdown",
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Complete => "complete",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of a session as of the last tick or command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub status: SessionStatus,
    pub phase: Phase,
    pub phase_elapsed_secs: f64,
    pub phase_time_remaining_secs: f64,
    /// 0.0 ..= 1.0
    pub phase_progress: f64,
    pub total_elapsed_secs: f64,
    pub total_time_remaining_secs: f64,
    pub total_duration_secs: f64,
    pub breath_count: u32,
    /// Pattern in effect, ramp-adjusted.
    pub current_pattern: BreathPattern,
    /// 0.0 ..= 1.0; 1.0 when there is no ramp.
    pub ramp_progress: f64,
    /// Whole seconds left in the pre-roll; 0 outside of it.
    pub countdown_remaining_secs: u32,
    pub session_id: Option<Uuid>,
    /// Set when the last session ended on a clock or tick failure.
    pub abort_reason: Option<String>,
}

impl SessionState {
    /// State before the first breath of a session built from `settings`.
    pub fn initial(settings: &SessionSettings) -> Self {
        let frame = settings.frame_at(0.0);
        Self {
            status: SessionStatus::Idle,
            phase: Phase::Inhale,
            phase_elapsed_secs: 0.0,
            phase_time_remaining_secs: frame.pattern.inhale,
            phase_progress: 0.0,
            total_elapsed_secs: 0.0,
            total_time_remaining_secs: settings.total_duration_secs,
            total_duration_secs: settings.total_duration_secs,
            breath_count: 0,
            current_pattern: frame.pattern,
            ramp_progress: frame.ramp_progress,
            countdown_remaining_secs: 0,
            session_id: None,
            abort_reason: None,
        }
    }
}
