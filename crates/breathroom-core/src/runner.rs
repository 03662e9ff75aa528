//! Periodic tick driver for a [`SessionEngine`].
//!
//! The runner owns at most one tick task. Every task is tagged with a
//! generation number; `stop()`, `pause()` and every new `start()` bump the
//! generation and abort the previous task before returning, and a task
//! re-checks its generation under the engine lock before ticking. A tick
//! from a superseded task can therefore never reach the engine.
//!
//! Must be used from inside a tokio runtime.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::events::Event;
use crate::session::{SessionEngine, SessionState};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Fans events and snapshots out to subscribers.
#[derive(Debug)]
struct Publisher {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Event>>>,
    state: watch::Sender<SessionState>,
}

impl Publisher {
    fn publish(&self, events: Vec<Event>, state: SessionState) {
        if !events.is_empty() {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.retain(|tx| events.iter().all(|e| tx.send(e.clone()).is_ok()));
        }
        self.state.send_replace(state);
    }
}

/// Decrements the live ticker count when a tick task ends or is cancelled.
struct LiveTicker(Arc<AtomicUsize>);

impl LiveTicker {
    fn enter(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count.clone())
    }
}

impl Drop for LiveTicker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct SessionRunner {
    engine: Arc<Mutex<SessionEngine>>,
    tick_interval: Duration,
    generation: Arc<AtomicU64>,
    live_tickers: Arc<AtomicUsize>,
    ticker: Option<JoinHandle<()>>,
    publisher: Arc<Publisher>,
}

impl std::fmt::Debug for SessionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRunner")
            .field("tick_interval", &self.tick_interval)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("live_tickers", &self.live_tickers.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl SessionRunner {
    pub fn new(engine: SessionEngine, tick_interval: Duration) -> Self {
        let (state, _) = watch::channel(engine.snapshot());
        Self {
            engine: Arc::new(Mutex::new(engine)),
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            generation: Arc::new(AtomicU64::new(0)),
            live_tickers: Arc::new(AtomicUsize::new(0)),
            ticker: None,
            publisher: Arc::new(Publisher {
                subscribers: Mutex::new(Vec::new()),
                state,
            }),
        }
    }

    /// Receive every event produced from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.publisher
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Latest snapshot, updated after every tick and command.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.publisher.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        lock(&self.engine).snapshot()
    }

    /// A tick task is scheduled for the current session.
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Tick tasks that have started and not yet ended.
    pub fn live_tickers(&self) -> usize {
        self.live_tickers.load(Ordering::SeqCst)
    }

    pub fn start(&mut self) -> Vec<Event> {
        let events = self.command(SessionEngine::start);
        if lock(&self.engine).status().is_ticking() {
            self.spawn_ticker();
        }
        events
    }

    pub fn pause(&mut self) -> Vec<Event> {
        let events = self.command(SessionEngine::pause);
        if !lock(&self.engine).status().is_ticking() {
            self.cancel_ticker();
        }
        events
    }

    pub fn resume(&mut self) -> Vec<Event> {
        let events = self.command(SessionEngine::resume);
        if lock(&self.engine).status().is_ticking() && !self.is_ticking() {
            self.spawn_ticker();
        }
        events
    }

    /// Cancel the ticker, then stop the engine. No tick runs after this returns.
    pub fn stop(&mut self) -> Vec<Event> {
        self.cancel_ticker();
        self.command(SessionEngine::stop)
    }

    /// Wait for the current tick task to end (completion, stop or abort).
    /// Returns immediately when nothing is ticking.
    pub async fn wait_until_finished(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            if let Err(e) = ticker.await {
                if !e.is_cancelled() {
                    error!(error = %e, "tick task failed");
                }
            }
        }
    }

    fn command(&self, f: impl FnOnce(&mut SessionEngine) -> Vec<Event>) -> Vec<Event> {
        let mut engine = lock(&self.engine);
        let events = f(&mut engine);
        self.publisher.publish(events.clone(), engine.snapshot());
        events
    }

    fn cancel_ticker(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn spawn_ticker(&mut self) {
        self.cancel_ticker();
        let generation = self.generation.load(Ordering::SeqCst);
        let current = self.generation.clone();
        let engine = self.engine.clone();
        let publisher = self.publisher.clone();
        let live = self.live_tickers.clone();
        let period = self.tick_interval;

        debug!(generation, ?period, "spawning tick task");
        self.ticker = Some(tokio::spawn(async move {
            let _live = LiveTicker::enter(&live);
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let mut guard = lock(&engine);
                if current.load(Ordering::SeqCst) != generation {
                    break;
                }
                let events = tick_guarded(&mut guard);
                let still_ticking = guard.status().is_ticking();
                publisher.publish(events, guard.snapshot());
                drop(guard);
                if !still_ticking {
                    break;
                }
            }
        }));
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

/// Tick, turning a panic inside the engine into an aborted session.
fn tick_guarded(engine: &mut SessionEngine) -> Vec<Event> {
    match panic::catch_unwind(AssertUnwindSafe(|| engine.tick())) {
        Ok(events) => events,
        Err(_) => {
            error!("session tick panicked; aborting session");
            engine.abort("tick loop failed")
        }
    }
}

fn lock(engine: &Mutex<SessionEngine>) -> MutexGuard<'_, SessionEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}
