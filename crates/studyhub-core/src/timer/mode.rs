//! Pomodoro modes and the policy that maps them to durations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Focus interval.
    #[default]
    Work,
    /// Short break.
    Short,
    /// Long break. Only reachable by explicit selection.
    Long,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Work, Mode::Short, Mode::Long];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Work => "work",
            Mode::Short => "short",
            Mode::Long => "long",
        }
    }

    /// Human-readable label used by the history view.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Work => "Work",
            Mode::Short => "Short Break",
            Mode::Long => "Long Break",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Mode::Work),
            "short" => Ok(Mode::Short),
            "long" => Ok(Mode::Long),
            other => Err(ValidationError::InvalidValue {
                field: "mode".into(),
                message: format!("'{other}' is not one of work, short, long"),
            }),
        }
    }
}

/// Duration table plus the auto-advance rule applied when a countdown
/// reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModePolicy {
    pub work_secs: u64,
    pub short_secs: u64,
    pub long_secs: u64,
}

impl Default for ModePolicy {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_secs: 5 * 60,
            long_secs: 15 * 60,
        }
    }
}

impl ModePolicy {
    /// Full countdown length for `mode`, in seconds.
    pub fn duration_for(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Work => self.work_secs,
            Mode::Short => self.short_secs,
            Mode::Long => self.long_secs,
        }
    }

    /// Mode selected automatically after `current` completes.
    ///
    /// Work alternates with the short break; a finished long break returns
    /// to work. Long is never chosen here.
    pub fn next_mode(&self, current: Mode) -> Mode {
        match current {
            Mode::Work => Mode::Short,
            Mode::Short | Mode::Long => Mode::Work,
        }
    }
}

/// Render a countdown as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
