mod engine;
mod phase;
mod settings;
mod simulation;
mod state;

pub use engine::SessionEngine;
pub use phase::{locate, PhaseReading};
pub use settings::{SessionSettings, DEFAULT_COUNTDOWN_SECS};
pub use simulation::{simulate, SimulationReport, SimulationStep};
pub use state::{SessionState, SessionStatus};
