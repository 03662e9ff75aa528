//! Ambient background loop, driven by session lifecycle events.
//!
//! The loop plays exactly while a session is running and not paused. The
//! controller listens to the engine's events instead of sharing a flag with
//! it, so nothing outside the session lifecycle can toggle playback.

use crate::error::CueError;
use crate::events::Event;

/// Backend that plays one looping background track.
pub trait AmbientSink: Send {
    fn start_ambient(&mut self, id: &str, volume: f64) -> Result<(), CueError>;
    fn stop_ambient(&mut self) -> Result<(), CueError>;
}

pub struct AmbientController {
    sink: Box<dyn AmbientSink>,
    sound_id: String,
    volume: f64,
    playing: bool,
}

impl std::fmt::Debug for AmbientController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbientController")
            .field("sound_id", &self.sound_id)
            .field("volume", &self.volume)
            .field("playing", &self.playing)
            .finish()
    }
}

impl AmbientController {
    pub fn new(sink: Box<dyn AmbientSink>, sound_id: impl Into<String>, volume: f64) -> Self {
        Self {
            sink,
            sound_id: sound_id.into(),
            volume: clamp_volume(volume),
            playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn handle(&mut self, event: &Event) -> Result<(), CueError> {
        match event {
            Event::SessionRunning { .. } | Event::SessionResumed { .. } => self.play(),
            Event::SessionPaused { .. }
            | Event::SessionStopped { .. }
            | Event::SessionCompleted { .. }
            | Event::SessionAborted { .. } => self.silence(),
            _ => Ok(()),
        }
    }

    fn play(&mut self) -> Result<(), CueError> {
        if self.playing {
            return Ok(());
        }
        self.sink.start_ambient(&self.sound_id, self.volume)?;
        self.playing = true;
        Ok(())
    }

    fn silence(&mut self) -> Result<(), CueError> {
        if !self.playing {
            return Ok(());
        }
        // Considered stopped even if the backend complains.
        self.playing = false;
        self.sink.stop_ambient()
    }
}

fn clamp_volume(volume: f64) -> f64 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
