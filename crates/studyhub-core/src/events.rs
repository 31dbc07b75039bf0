use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Session;
use crate::timer::{Mode, TimerState};

/// Every state change of the timer produces an Event.
/// Front-ends render them; the driver broadcasts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ModeSelected {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerTick {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero; `next_mode` is already selected and idle.
    TimerCompleted {
        mode: Mode,
        next_mode: Mode,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    SessionRecorded {
        session: Session,
    },
    /// The completed interval could not be persisted and is lost.
    SessionRecordFailed {
        mode: Mode,
        error: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        mode: Mode,
        label: String,
        remaining_secs: u64,
        total_secs: u64,
        clock: String,
        at: DateTime<Utc>,
    },
}
