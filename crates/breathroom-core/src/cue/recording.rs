use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::{AmbientSink, CueSink, HapticPattern, HapticSink, PhaseCue};
use crate::error::CueError;
use crate::pattern::Phase;

/// Sink that drops every cue.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCueSink;

impl CueSink for NullCueSink {
    fn phase_enter(&mut self, _cue: &PhaseCue<'_>) -> Result<(), CueError> {
        Ok(())
    }
}

/// One cue as a sink received it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum CueRecord {
    PhaseSound {
        phase: Phase,
        key: String,
        volume: f64,
    },
    Haptic {
        pattern: HapticPattern,
    },
    CountdownTick {
        remaining_secs: u32,
    },
    SessionStart,
    SessionComplete {
        breath_count: u32,
    },
    AmbientStart {
        id: String,
        volume: f64,
    },
    AmbientStop,
}

/// Read handle onto a [`RecordingCueSink`]'s log.
#[derive(Debug, Clone, Default)]
pub struct CueLog {
    records: Arc<Mutex<Vec<CueRecord>>>,
}

impl CueLog {
    pub fn records(&self) -> Vec<CueRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Phase sounds only, in order.
    pub fn phases(&self) -> Vec<Phase> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                CueRecord::PhaseSound { phase, .. } => Some(phase),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    fn push(&self, record: CueRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

/// Sink that keeps every cue in memory.
///
/// Implements all three sink traits; clones append to the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingCueSink {
    log: CueLog,
}

impl RecordingCueSink {
    pub fn new() -> (Self, CueLog) {
        let sink = Self::default();
        let log = sink.log.clone();
        (sink, log)
    }
}

impl CueSink for RecordingCueSink {
    fn phase_enter(&mut self, cue: &PhaseCue<'_>) -> Result<(), CueError> {
        self.log.push(CueRecord::PhaseSound {
            phase: cue.phase,
            key: cue.sound_key(),
            volume: cue.volume,
        });
        Ok(())
    }

    fn countdown_tick(&mut self, remaining_secs: u32, _volume: f64) -> Result<(), CueError> {
        self.log.push(CueRecord::CountdownTick { remaining_secs });
        Ok(())
    }

    fn session_start(&mut self, _volume: f64) -> Result<(), CueError> {
        self.log.push(CueRecord::SessionStart);
        Ok(())
    }

    fn session_complete(&mut self, breath_count: u32, _volume: f64) -> Result<(), CueError> {
        self.log.push(CueRecord::SessionComplete { breath_count });
        Ok(())
    }
}

impl HapticSink for RecordingCueSink {
    fn pulse(&mut self, pattern: HapticPattern) -> Result<(), CueError> {
        self.log.push(CueRecord::Haptic { pattern });
        Ok(())
    }
}

impl AmbientSink for RecordingCueSink {
    fn start_ambient(&mut self, id: &str, volume: f64) -> Result<(), CueError> {
        self.log.push(CueRecord::AmbientStart {
            id: id.to_string(),
            volume,
        });
        Ok(())
    }

    fn stop_ambient(&mut self) -> Result<(), CueError> {
        self.log.push(CueRecord::AmbientStop);
        Ok(())
    }
}
