//! SQLite-based session storage.
//!
//! Provides persistent storage for:
//! - Pomodoro session records (create, list, delete; never update)
//! - Key-value store for front-end state such as a paused timer

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection};
use tracing::debug;
use uuid::Uuid;

use super::config::Config;
use super::store::{clamp_limit, SessionStore};
use crate::error::{DatabaseError, Result, StoreError};
use crate::session::{Session, SessionDraft};
use crate::timer::Mode;

const SESSIONS_TABLE: &str = "pomodoro_sessions";

/// SQLite database for session storage.
///
/// Clones share one connection behind a mutex. The async [`SessionStore`]
/// impl runs every query on the blocking thread pool.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database configured in `config`, by default
    /// `<data_dir>/studyhub.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory, the file or the schema
    /// cannot be prepared.
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.database_path()?;
        debug!(path = %path.display(), "opening database");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn
            .lock()
            .map_err(|_| DatabaseError::QueryFailed("connection mutex poisoned".into()))
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS pomodoro_sessions (
                    id          TEXT PRIMARY KEY,
                    mode        TEXT NOT NULL CHECK (mode IN ('work', 'short', 'long')),
                    started_at  TEXT NOT NULL,
                    ended_at    TEXT NOT NULL,
                    created_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_pomodoro_sessions_created_at
                    ON pomodoro_sessions(created_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Persist a validated draft, assigning a fresh id and `created_at`.
    pub fn insert_session(&self, draft: &SessionDraft) -> Result<Session, StoreError> {
        draft.validate()?;
        // Timestamps are stored with microsecond precision.
        let session = Session {
            id: Uuid::new_v4().to_string(),
            mode: draft.mode,
            start: draft.start.trunc_subsecs(6),
            end: draft.end.trunc_subsecs(6),
            created_at: Utc::now().trunc_subsecs(6),
        };
        self.conn()?.execute(
            "INSERT INTO pomodoro_sessions (id, mode, started_at, ended_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id,
                session.mode.as_str(),
                encode_ts(session.start),
                encode_ts(session.end),
                encode_ts(session.created_at),
            ],
        )?;
        Ok(session)
    }

    /// Most recently created first. Insertion order breaks `created_at` ties.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<Session>, DatabaseError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, mode, started_at, ended_at, created_at
             FROM pomodoro_sessions
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![clamp_limit(limit) as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, mode, start, end, created_at) = row?;
            sessions.push(Session {
                mode: mode.parse::<Mode>().map_err(|e| corrupt(e.to_string()))?,
                start: decode_ts(&start)?,
                end: decode_ts(&end)?,
                created_at: decode_ts(&created_at)?,
                id,
            });
        }
        Ok(sessions)
    }

    /// Returns `false` when no session had this id.
    pub fn delete_session(&self, id: &str) -> Result<bool, DatabaseError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM pomodoro_sessions WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Returns the number of removed sessions.
    pub fn delete_all_sessions(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn()?.execute("DELETE FROM pomodoro_sessions", [])?)
    }

    pub fn count_sessions(&self) -> Result<u64, DatabaseError> {
        Ok(self
            .conn()?
            .query_row("SELECT COUNT(*) FROM pomodoro_sessions", [], |row| {
                row.get::<_, u64>(0)
            })?)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl Database {
    /// Run `f` on a clone of this handle on the blocking thread pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(Database) -> Result<T, StoreError> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(db))
            .await
            .map_err(|e| {
                StoreError::Database(DatabaseError::QueryFailed(format!(
                    "blocking task failed: {e}"
                )))
            })?
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn list(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        self.blocking(move |db| Ok(db.list_sessions(limit)?)).await
    }

    async fn create(&self, draft: SessionDraft) -> Result<Session, StoreError> {
        self.blocking(move |db| db.insert_session(&draft)).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        self.blocking(move |db| {
            if db.delete_session(&id)? {
                Ok(())
            } else {
                Err(StoreError::NotFound(id))
            }
        })
        .await
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.blocking(|db| {
            db.delete_all_sessions()?;
            Ok(())
        })
        .await
    }
}

fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(format!("bad timestamp '{raw}': {e}")))
}

fn corrupt(message: String) -> DatabaseError {
    DatabaseError::CorruptRow {
        table: SESSIONS_TABLE,
        message,
    }
}
