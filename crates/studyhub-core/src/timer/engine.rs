//! Timer engine implementation.
//!
//! The timer engine is a tick-driven state machine. It does not use
//! internal threads and never reads the clock itself: every command takes
//! the current instant, and the caller is responsible for calling `tick()`
//! once per elapsed second while running (see [`TimerDriver`]).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> (expired) -> Idle (next mode)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(ModePolicy::default());
//! engine.start(Utc::now());
//! // Once per second:
//! if let Some(done) = engine.tick(Utc::now()) {
//!     store.create(done.session).await?;
//! }
//! ```
//!
//! [`TimerDriver`]: super::TimerDriver

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::mode::{format_clock, Mode, ModePolicy};
use crate::events::Event;
use crate::session::SessionDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    /// Not running, full duration remaining.
    Idle,
    Running,
    /// Not running, part of the countdown already consumed.
    Paused,
}

/// Result of a countdown reaching zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Record to hand to the session store.
    pub session: SessionDraft,
    /// Mode the engine switched to; it is idle with a full countdown.
    pub next_mode: Mode,
}

impl Completion {
    pub fn event(&self) -> Event {
        Event::TimerCompleted {
            mode: self.session.mode,
            next_mode: self.next_mode,
            start: self.session.start,
            end: self.session.end,
        }
    }
}

/// Core timer engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    policy: ModePolicy,
    mode: Mode,
    remaining_secs: u64,
    running: bool,
    /// When the countdown was last (re)started. Becomes the session start.
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    /// Instant up to which ticks have been applied, for `catch_up`.
    #[serde(default)]
    last_tick_at: Option<DateTime<Utc>>,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(ModePolicy::default())
    }
}

impl TimerEngine {
    /// Create an idle engine in the default mode with its full duration.
    pub fn new(policy: ModePolicy) -> Self {
        let mode = Mode::default();
        Self {
            policy,
            mode,
            remaining_secs: policy.duration_for(mode),
            running: false,
            started_at: None,
            last_tick_at: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        if self.running {
            TimerState::Running
        } else if self.remaining_secs == self.total_secs() {
            TimerState::Idle
        } else {
            TimerState::Paused
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn policy(&self) -> &ModePolicy {
        &self.policy
    }

    pub fn total_secs(&self) -> u64 {
        self.policy.duration_for(self.mode)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            state: self.state(),
            mode: self.mode,
            label: self.mode.label().to_string(),
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs(),
            clock: format_clock(self.remaining_secs),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Direct user override of the mode. Valid from any state.
    pub fn select_mode(&mut self, mode: Mode, now: DateTime<Utc>) -> Event {
        self.mode = mode;
        self.stop_countdown();
        Event::ModeSelected {
            mode,
            remaining_secs: self.remaining_secs,
            at: now,
        }
    }

    /// Start or resume the countdown. `None` if already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.running {
            return None;
        }
        self.running = true;
        self.started_at = Some(now);
        self.last_tick_at = Some(now);
        Some(Event::TimerStarted {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: now,
        })
    }

    /// Pause, keeping the remaining time. `None` if not running.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        self.last_tick_at = None;
        Some(Event::TimerPaused {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: now,
        })
    }

    /// Restore the full duration of the current mode. Valid from any state.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Event {
        self.stop_countdown();
        Event::TimerReset {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: now,
        }
    }

    /// Apply one elapsed second. Returns the completion when the countdown
    /// reaches zero, at most once per countdown.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Completion> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.last_tick_at = Some(now);
        if self.remaining_secs > 0 {
            return None;
        }

        let finished = self.mode;
        let start = self
            .started_at
            .unwrap_or_else(|| now - Duration::seconds(self.total_secs() as i64));
        let next_mode = self.policy.next_mode(finished);
        self.mode = next_mode;
        self.stop_countdown();

        Some(Completion {
            session: SessionDraft {
                mode: finished,
                start,
                end: now,
            },
            next_mode,
        })
    }

    /// Apply every whole second that elapsed since the last applied tick.
    ///
    /// Stops at the first completion; its `end` is the instant the
    /// countdown actually reached zero, not `now`.
    pub fn catch_up(&mut self, now: DateTime<Utc>) -> Option<Completion> {
        if !self.running {
            return None;
        }
        let anchor = self.last_tick_at.or(self.started_at).unwrap_or(now);
        let elapsed = (now - anchor).num_seconds().max(0) as u64;
        let due = elapsed.min(self.remaining_secs);
        for i in 1..=due {
            let at = anchor + Duration::seconds(i as i64);
            if let Some(done) = self.tick(at) {
                return Some(done);
            }
        }
        None
    }

    pub fn set_policy(&mut self, policy: ModePolicy, now: DateTime<Utc>) -> Event {
        self.policy = policy;
        self.reset(now)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn stop_countdown(&mut self) {
        self.running = false;
        self.remaining_secs = self.total_secs();
        self.started_at = None;
        self.last_tick_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    /// Tick once per second from `from`, returning every completion.
    fn run_ticks(engine: &mut TimerEngine, from: DateTime<Utc>, n: u64) -> Vec<Completion> {
        (1..=n)
            .filter_map(|i| engine.tick(from + secs(i as i64)))
            .collect()
    }

    #[test]
    fn new_engine_is_idle_work() {
        let engine = TimerEngine::default();
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.mode(), Mode::Work);
        assert_eq!(engine.remaining_secs(), 1500);
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::default();
        assert!(engine.start(t0()).is_some());
        assert_eq!(engine.state(), TimerState::Running);
        assert!(engine.start(t0()).is_none(), "start while running is rejected");

        run_ticks(&mut engine, t0(), 10);
        assert!(engine.pause(t0() + secs(10)).is_some());
        assert_eq!(engine.state(), TimerState::Paused);
        assert_eq!(engine.remaining_secs(), 1490);
        assert!(engine.pause(t0() + secs(11)).is_none(), "pause while paused is rejected");

        assert!(engine.tick(t0() + secs(12)).is_none());
        assert_eq!(engine.remaining_secs(), 1490, "ticks are ignored while paused");

        engine.start(t0() + secs(20));
        assert_eq!(engine.remaining_secs(), 1490, "resume keeps remaining time");
        assert_eq!(engine.started_at(), Some(t0() + secs(20)));
    }

    #[test]
    fn countdown_completes_once_with_duration() {
        let mut engine = TimerEngine::default();
        engine.select_mode(Mode::Short, t0());
        engine.start(t0());

        let completions = run_ticks(&mut engine, t0(), 300);
        assert_eq!(completions.len(), 1);
        let done = &completions[0];
        assert_eq!(done.session.mode, Mode::Short);
        let elapsed = (done.session.end - done.session.start).num_seconds();
        assert!((elapsed - 300).abs() <= 1, "elapsed was {elapsed}");
        assert_eq!(done.next_mode, Mode::Work);

        assert!(run_ticks(&mut engine, t0() + secs(300), 5).is_empty());
    }

    #[test]
    fn work_completion_advances_to_idle_short() {
        let mut engine = TimerEngine::default();
        engine.start(t0());
        let completions = run_ticks(&mut engine, t0(), 1500);

        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].session.mode, Mode::Work);
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.mode(), Mode::Short);
        assert_eq!(engine.remaining_secs(), 300);
        assert!(!engine.is_running());
    }

    #[test]
    fn long_break_returns_to_work() {
        let mut engine = TimerEngine::default();
        engine.select_mode(Mode::Long, t0());
        engine.start(t0());
        let completions = run_ticks(&mut engine, t0(), 900);
        assert_eq!(completions.len(), 1);
        assert_eq!(engine.mode(), Mode::Work);
        assert_eq!(engine.remaining_secs(), 1500);
    }

    #[test]
    fn pause_resume_cycles_produce_single_session() {
        let mut engine = TimerEngine::default();
        engine.select_mode(Mode::Short, t0());
        let mut now = t0();
        let mut completions = Vec::new();
        engine.start(now);
        for round in 0..10 {
            completions.extend(run_ticks(&mut engine, now, 20));
            now = now + secs(20);
            engine.pause(now);
            assert_eq!(engine.remaining_secs(), 300 - 20 * (round + 1));
            now = now + secs(60);
            engine.start(now);
        }
        completions.extend(run_ticks(&mut engine, now, 200));
        assert_eq!(completions.len(), 1);
    }

    #[test]
    fn select_mode_while_running_cancels_countdown() {
        let mut engine = TimerEngine::default();
        engine.start(t0());
        run_ticks(&mut engine, t0(), 42);
        engine.select_mode(Mode::Long, t0() + secs(42));
        assert_eq!(engine.mode(), Mode::Long);
        assert_eq!(engine.remaining_secs(), 900);
        assert!(!engine.is_running());
        assert!(engine.tick(t0() + secs(43)).is_none());
        assert_eq!(engine.remaining_secs(), 900);
    }

    #[test]
    fn reset_restores_full_duration_from_any_state() {
        let mut engine = TimerEngine::default();
        engine.reset(t0());
        assert_eq!(engine.remaining_secs(), 1500);

        engine.start(t0());
        run_ticks(&mut engine, t0(), 5);
        engine.reset(t0() + secs(5));
        assert_eq!(engine.remaining_secs(), 1500);
        assert_eq!(engine.state(), TimerState::Idle);

        engine.start(t0());
        run_ticks(&mut engine, t0(), 5);
        engine.pause(t0() + secs(5));
        engine.reset(t0() + secs(6));
        assert_eq!(engine.remaining_secs(), 1500);
        assert!(!engine.is_running());
    }

    #[test]
    fn missing_start_falls_back_to_full_duration() {
        let mut engine = TimerEngine::default();
        engine.select_mode(Mode::Short, t0());
        engine.start(t0());
        run_ticks(&mut engine, t0(), 299);
        engine.started_at = None;
        let done = engine.tick(t0() + secs(300)).unwrap();
        assert_eq!(done.session.start, t0());
        assert_eq!(done.session.end, t0() + secs(300));
    }

    #[test]
    fn catch_up_applies_elapsed_seconds() {
        let mut engine = TimerEngine::default();
        engine.start(t0());
        assert!(engine.catch_up(t0() + Duration::milliseconds(61_900)).is_none());
        assert_eq!(engine.remaining_secs(), 1500 - 61);
        assert!(engine.catch_up(t0() + secs(62)).is_none());
        assert_eq!(engine.remaining_secs(), 1500 - 62);
    }

    #[test]
    fn catch_up_reports_real_expiry_instant() {
        let mut engine = TimerEngine::default();
        engine.select_mode(Mode::Short, t0());
        engine.start(t0());
        let done = engine.catch_up(t0() + secs(3600)).unwrap();
        assert_eq!(done.session.start, t0());
        assert_eq!(done.session.end, t0() + secs(300));
        assert_eq!(engine.mode(), Mode::Work);
        assert_eq!(engine.state(), TimerState::Idle);
        assert!(engine.catch_up(t0() + secs(7200)).is_none());
    }

    #[test]
    fn engine_state_survives_serde() {
        let mut engine = TimerEngine::default();
        engine.start(t0());
        run_ticks(&mut engine, t0(), 3);
        let json = serde_json::to_string(&engine).unwrap();
        let mut restored: TimerEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.remaining_secs(), 1497);
        assert!(restored.is_running());
        restored.catch_up(t0() + secs(10));
        assert_eq!(restored.remaining_secs(), 1490);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let engine = TimerEngine::default();
        match engine.snapshot(t0()) {
            Event::StateSnapshot {
                state,
                remaining_secs,
                clock,
                label,
                ..
            } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(remaining_secs, 1500);
                assert_eq!(clock, "25:00");
                assert_eq!(label, "Work");
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn mode_strategy() -> impl Strategy<Value = Mode> {
            prop_oneof![Just(Mode::Work), Just(Mode::Short), Just(Mode::Long)]
        }

        proptest! {
            #[test]
            fn full_countdown_yields_exactly_one_session(mode in mode_strategy(), extra in 0u64..50) {
                let mut engine = TimerEngine::default();
                engine.select_mode(mode, t0());
                engine.start(t0());
                let total = engine.total_secs();
                let completions = run_ticks(&mut engine, t0(), total + extra);
                prop_assert_eq!(completions.len(), 1);
                prop_assert_eq!(completions[0].session.mode, mode);
                prop_assert_eq!(engine.mode(), ModePolicy::default().next_mode(mode));
            }

            #[test]
            fn partial_countdown_never_completes(mode in mode_strategy(), frac in 0.0f64..0.99) {
                let mut engine = TimerEngine::default();
                engine.select_mode(mode, t0());
                engine.start(t0());
                let n = (engine.total_secs() as f64 * frac) as u64;
                prop_assert!(run_ticks(&mut engine, t0(), n).is_empty());
                prop_assert_eq!(engine.remaining_secs(), engine.total_secs() - n);
            }
        }
    }
}
