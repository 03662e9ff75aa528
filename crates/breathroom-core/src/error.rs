//! Core error types for breathroom-core.
//!
//! Configuration problems surface as errors at construction time; cue and
//! clock failures are handled inside the session engine and only reach
//! callers as log lines or an aborted session.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid breath pattern, ramp or preset
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Invalid session settings or an illegal session operation
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Time source failure
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors for patterns, ramps and presets.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    /// A timing field is NaN or infinite
    #[error("Pattern '{id}': {field} must be a finite number, got {value}")]
    NonFinite {
        id: String,
        field: &'static str,
        value: f64,
    },

    /// A timing field is negative
    #[error("Pattern '{id}': {field} must not be negative, got {value}")]
    Negative {
        id: String,
        field: &'static str,
        value: f64,
    },

    /// Inhale or exhale is zero
    #[error("Pattern '{id}': {field} must be greater than zero")]
    ZeroBreath { id: String, field: &'static str },

    /// Pattern id is empty
    #[error("Pattern id must not be empty")]
    EmptyId,

    /// Ramp duration is zero, negative or not finite
    #[error("Ramp duration must be a positive finite number of seconds, got {0}")]
    InvalidRampDuration(f64),

    /// Preset duration is zero
    #[error("Preset '{0}' must have a duration of at least one minute")]
    InvalidPresetDuration(String),

    /// Two entries share an id
    #[error("Duplicate {kind} id '{id}'")]
    Duplicate { kind: &'static str, id: String },

    /// Lookup failed
    #[error("Unknown {kind} '{id}'")]
    NotFound { kind: &'static str, id: String },
}

/// Session-level errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Settings rejected before any tick runs
    #[error("Invalid session settings: {0}")]
    InvalidSettings(String),

    /// The operation requires an inactive engine
    #[error("A session is already active ({status})")]
    SessionActive { status: String },
}

/// Time source errors. Fatal to the running session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClockError {
    /// The clock cannot provide a reading
    #[error("Clock unavailable: {0}")]
    Unavailable(String),

    /// The clock went backwards past an anchor
    #[error("Clock went backwards: {now_ms}ms is before anchor {anchor_ms}ms")]
    WentBackwards { now_ms: u64, anchor_ms: u64 },
}

/// Cue backend errors. Always swallowed by the dispatcher.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CueError {
    /// The audio backend cannot play
    #[error("Audio backend unavailable: {0}")]
    AudioUnavailable(String),

    /// The device has no vibration support
    #[error("Haptics unavailable: {0}")]
    HapticsUnavailable(String),

    /// Anything else reported by a sink
    #[error("Cue failed: {0}")]
    Failed(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-separated key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to locate the data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
