//! # Breathroom Core Library
//!
//! This library provides the core logic for the Breathroom paced-breathing
//! guide. Everything a front end needs lives here; the CLI binary and any
//! GUI are thin layers over the same engine.
//!
//! ## Architecture
//!
//! - **Patterns**: Validated four-phase breath patterns, the built-in catalog
//!   and purpose presets
//! - **Ramp**: Gradual transition from one pattern to another over time
//! - **Session Engine**: A wall-clock-based state machine that requires the
//!   caller to periodically invoke `tick()` for progress updates
//! - **Cues**: Fire-and-forget sound, haptic and ambient output
//! - **Runner**: A tokio tick driver with cancellable tick tasks
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core session state machine
//! - [`PatternLibrary`]: Built-in and custom patterns
//! - [`CueDispatcher`]: Routes phase transitions to cue sinks
//! - [`Clock`]: Injectable time source
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod cue;
pub mod error;
pub mod events;
pub mod pattern;
pub mod ramp;
pub mod runner;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use cue::{CueDispatcher, CueSettings, CueSink, SoundProfile};
pub use error::{ClockError, ConfigError, CoreError, CueError, PatternError, SessionError};
pub use events::Event;
pub use pattern::{BreathPattern, Phase, PatternLibrary, PurposePreset};
pub use ramp::RampConfig;
pub use runner::SessionRunner;
pub use session::{SessionEngine, SessionSettings, SessionState, SessionStatus};
pub use storage::Config;
