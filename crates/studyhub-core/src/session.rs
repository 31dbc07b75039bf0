//! Pomodoro session records.
//!
//! A [`Session`] is immutable once stored: stores expose create and delete
//! but never update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::timer::Mode;

/// A persisted pomodoro interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub mode: Mode,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Length of the interval in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

/// A session that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub mode: Mode,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SessionDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start > self.end {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Raw body of a create request, before validation.
///
/// Every field is optional so that a missing one is reported as a
/// validation failure instead of a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl CreateSessionRequest {
    pub fn into_draft(self) -> Result<SessionDraft, ValidationError> {
        let (Some(mode), Some(start), Some(end)) = (
            non_empty(self.mode),
            non_empty(self.start),
            non_empty(self.end),
        ) else {
            return Err(ValidationError::MissingFields);
        };

        let draft = SessionDraft {
            mode: mode.parse()?,
            start: parse_timestamp("start", &start)?,
            end: parse_timestamp("end", &end)?,
        };
        draft.validate()?;
        Ok(draft)
    }
}

impl From<&SessionDraft> for CreateSessionRequest {
    fn from(draft: &SessionDraft) -> Self {
        Self {
            mode: Some(draft.mode.to_string()),
            start: Some(draft.start.to_rfc3339()),
            end: Some(draft.end.to_rfc3339()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("'{raw}' is not an RFC 3339 timestamp: {e}"),
        })
}
