//! Session history view.
//!
//! Holds the last list read from a [`SessionStore`] and renders it as text.
//! A failed read keeps the previous list on screen.

use std::fmt::{Display, Write as _};

use chrono::{Local, TimeZone};
use tracing::warn;

use crate::error::StoreError;
use crate::session::Session;
use crate::storage::{SessionStore, DEFAULT_LIST_LIMIT};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default, Clone)]
pub struct SessionHistory {
    sessions: Vec<Session>,
    last_error: Option<String>,
}

impl From<Vec<Session>> for SessionHistory {
    fn from(sessions: Vec<Session>) -> Self {
        Self {
            sessions,
            last_error: None,
        }
    }
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Error of the most recent failed read, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Re-read the store. Returns `true` if the list was replaced.
    pub async fn refresh(&mut self, store: &dyn SessionStore) -> bool {
        match store.list(DEFAULT_LIST_LIMIT).await {
            Ok(sessions) => {
                self.sessions = sessions;
                self.last_error = None;
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to load session history");
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    /// Called after a session was created successfully.
    pub async fn record_created(&mut self, store: &dyn SessionStore) -> bool {
        self.refresh(store).await
    }

    /// Bulk delete through the store, then re-read.
    ///
    /// On failure nothing is cleared locally.
    pub async fn clear(&mut self, store: &dyn SessionStore) -> Result<(), StoreError> {
        store.delete_all().await.map_err(|e| {
            warn!(error = %e, "failed to clear session history");
            e
        })?;
        if !self.refresh(store).await {
            self.sessions.clear();
        }
        Ok(())
    }

    /// Render in the local time zone.
    pub fn render(&self) -> String {
        self.render_in(&Local)
    }

    pub fn render_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut out = String::from("Session history\n");
        if self.sessions.is_empty() {
            out.push_str("No sessions logged yet.\n");
            return out;
        }
        for session in &self.sessions {
            let _ = writeln!(out, "{}", render_entry(session, tz));
        }
        out
    }
}

/// One entry: label line plus the `From .. to ..` line.
pub fn render_entry<Tz>(session: &Session, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{}\n  From {} to {}",
        session.mode.label(),
        session.start.with_timezone(tz).format(TIME_FORMAT),
        session.end.with_timezone(tz).format(TIME_FORMAT),
    )
}
