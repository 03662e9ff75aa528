//! Time sources for the session engine.
//!
//! The engine only ever subtracts two readings of the same clock, so a clock
//! needs to be monotonic, not calendar-accurate. Readings are milliseconds
//! since an arbitrary per-clock origin.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ClockError;

pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Milliseconds since this clock's origin.
    fn now_ms(&self) -> Result<u64, ClockError>;
}

/// Real clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Result<u64, ClockError> {
        u64::try_from(self.origin.elapsed().as_millis())
            .map_err(|_| ClockError::Unavailable("monotonic reading overflowed u64".into()))
    }
}

/// Controllable clock for tests and simulations.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u64) -> Self {
        let clock = Self::new();
        clock.set_ms(ms);
        clock
    }

    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.advance_ms(ms);
    }

    pub fn advance_ms(&self, ms: u64) {
        let _ = self
            .now_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.saturating_add(ms))
            });
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs.saturating_mul(1000));
    }

    pub fn set_ms(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    pub fn current_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    /// Make every subsequent reading fail until [`recover`](Self::recover).
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Result<u64, ClockError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClockError::Unavailable("manual clock set to fail".into()));
        }
        Ok(self.current_ms())
    }
}
