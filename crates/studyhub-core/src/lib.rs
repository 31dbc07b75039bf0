//! # StudyHub Core Library
//!
//! Business logic for the StudyHub pomodoro timer. The REST server and the
//! CLI are thin front-ends over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a tick-driven state machine; the caller supplies
//!   the clock and calls `tick()` once per second
//! - **Timer Driver**: tokio task that owns the engine, ticks it on a
//!   monotonic interval and records completed sessions without blocking
//! - **Storage**: `SessionStore` trait with SQLite and HTTP implementations,
//!   TOML-based configuration
//! - **History**: last-known session list and its text rendering
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerDriver`]: Async countdown driver
//! - [`SessionStore`]: Session persistence boundary
//! - [`Database`]: SQLite session store
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod history;
pub mod logging;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, StoreError, ValidationError};
pub use events::Event;
pub use history::SessionHistory;
pub use session::{CreateSessionRequest, Session, SessionDraft};
pub use storage::{Config, Database, HttpSessionStore, SessionStore, DEFAULT_LIST_LIMIT};
pub use timer::{format_clock, Completion, Mode, ModePolicy, TimerDriver, TimerEngine, TimerState};
