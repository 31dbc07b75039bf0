//! Async driver that ticks a [`TimerEngine`] once per second.
//!
//! The driver is the single mutator of the engine. The countdown runs on a
//! spawned task fed by a monotonic `tokio::time::interval`; the task handle
//! is aborted on every pause, reset and mode change. Each ticker also carries
//! a generation number, so a tick that races a cancellation is dropped
//! instead of decrementing a countdown it no longer owns.
//!
//! Persisting a completed session is fire-and-forget: the engine has already
//! moved on to the next mode by the time the store answers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::engine::{Completion, TimerEngine};
use super::mode::Mode;
use crate::events::Event;
use crate::session::SessionDraft;
use crate::storage::SessionStore;

const EVENT_CAPACITY: usize = 256;

struct Inner {
    engine: TimerEngine,
    generation: u64,
}

#[derive(Clone)]
pub struct TimerDriver {
    inner: Arc<Mutex<Inner>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    store: Arc<dyn SessionStore>,
    events: broadcast::Sender<Event>,
    tick_interval: Duration,
}

impl TimerDriver {
    pub fn new(engine: TimerEngine, store: Arc<dyn SessionStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                engine,
                generation: 0,
            })),
            ticker: Arc::new(Mutex::new(None)),
            store,
            events,
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Override the tick period. One tick always counts as one second of
    /// countdown; only the wall-clock pacing changes.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Copy of the current engine state.
    pub async fn engine(&self) -> TimerEngine {
        self.inner.lock().await.engine.clone()
    }

    pub async fn start(&self) -> Option<Event> {
        let (event, generation) = {
            let mut inner = self.inner.lock().await;
            let event = inner.engine.start(Utc::now())?;
            inner.generation += 1;
            (event, inner.generation)
        };
        self.spawn_ticker(generation).await;
        self.publish(event.clone());
        Some(event)
    }

    pub async fn pause(&self) -> Option<Event> {
        let event = {
            let mut inner = self.inner.lock().await;
            let event = inner.engine.pause(Utc::now())?;
            inner.generation += 1;
            event
        };
        self.cancel_ticker().await;
        self.publish(event.clone());
        Some(event)
    }

    pub async fn reset(&self) -> Event {
        let event = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.engine.reset(Utc::now())
        };
        self.cancel_ticker().await;
        self.publish(event.clone());
        event
    }

    pub async fn select_mode(&self, mode: Mode) -> Event {
        let event = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.engine.select_mode(mode, Utc::now())
        };
        self.cancel_ticker().await;
        self.publish(event.clone());
        event
    }

    async fn spawn_ticker(&self, generation: u64) {
        let mut ticker = self.ticker.lock().await;
        if let Some(handle) = ticker.take() {
            handle.abort();
        }

        let inner = self.inner.clone();
        let store = self.store.clone();
        let events = self.events.clone();
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;

                let (tick, completion) = {
                    let mut guard = inner.lock().await;
                    if guard.generation != generation || !guard.engine.is_running() {
                        debug!(generation, "stale ticker stopped");
                        break;
                    }
                    let now = Utc::now();
                    let completion = guard.engine.tick(now);
                    let tick = Event::TimerTick {
                        mode: guard.engine.mode(),
                        remaining_secs: guard.engine.remaining_secs(),
                        at: now,
                    };
                    if completion.is_some() {
                        guard.generation += 1;
                    }
                    (tick, completion)
                };

                match completion {
                    None => {
                        let _ = events.send(tick);
                    }
                    Some(done) => {
                        finish(done, store, events);
                        break;
                    }
                }
            }
        });

        *ticker = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn finish(done: Completion, store: Arc<dyn SessionStore>, events: broadcast::Sender<Event>) {
    info!(
        mode = %done.session.mode,
        next_mode = %done.next_mode,
        "countdown completed"
    );
    let _ = events.send(done.event());
    tokio::spawn(record(done.session, store, events));
}

async fn record(draft: SessionDraft, store: Arc<dyn SessionStore>, events: broadcast::Sender<Event>) {
    let mode = draft.mode;
    match store.create(draft).await {
        Ok(session) => {
            info!(id = %session.id, mode = %session.mode, "session recorded");
            let _ = events.send(Event::SessionRecorded { session });
        }
        Err(e) => {
            warn!(mode = %mode, error = %e, "failed to record completed session");
            let _ = events.send(Event::SessionRecordFailed {
                mode,
                error: e.to_string(),
                at: Utc::now(),
            });
        }
    }
}
