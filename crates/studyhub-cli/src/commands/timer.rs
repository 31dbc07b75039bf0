use std::io::Write as _;
use std::sync::Arc;

use chrono::Utc;
use clap::Subcommand;
use studyhub_core::{
    format_clock, Completion, Config, Database, Event, Mode, SessionHistory, SessionStore,
    TimerDriver, TimerEngine, ValidationError,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::{open_local, open_store, print_json, CliResult};

const ENGINE_KEY: &str = "timer_engine";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Stop and restore the full duration of the current mode
    Reset,
    /// Print current timer state as JSON
    Status,
    /// Switch mode (work, short, long); stops a running countdown
    Mode {
        #[arg(value_parser = parse_mode)]
        mode: Mode,
    },
    /// Run the countdown in the foreground until it completes
    Run {
        /// Select this mode before starting
        #[arg(long, value_parser = parse_mode)]
        mode: Option<Mode>,
    },
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse().map_err(|e: ValidationError| e.to_string())
}

fn load_engine(db: &Database, config: &Config) -> TimerEngine {
    let policy = config.mode_policy();
    let engine = match db.kv_get(ENGINE_KEY) {
        Ok(Some(json)) => serde_json::from_str::<TimerEngine>(&json).ok(),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "failed to read saved timer");
            None
        }
    };
    match engine {
        Some(mut engine) => {
            if *engine.policy() != policy && !engine.is_running() {
                debug!("timer durations changed, resetting countdown");
                engine.set_policy(policy, Utc::now());
            }
            engine
        }
        None => TimerEngine::new(policy),
    }
}

fn save_engine(db: &Database, engine: &TimerEngine) -> CliResult {
    let json = serde_json::to_string(engine)?;
    db.kv_set(ENGINE_KEY, &json)?;
    Ok(())
}

/// Persist a completed interval. A failure is reported but not fatal.
async fn record(store: &dyn SessionStore, completion: Completion) -> Event {
    let mode = completion.session.mode;
    match store.create(completion.session).await {
        Ok(session) => Event::SessionRecorded { session },
        Err(e) => {
            warn!(error = %e, mode = %mode, "failed to record session");
            Event::SessionRecordFailed {
                mode,
                error: e.to_string(),
                at: Utc::now(),
            }
        }
    }
}

pub async fn run(action: TimerAction) -> CliResult {
    let config = Config::load()?;
    let db = open_local(&config)?;
    let store = open_store(&config)?;
    let mut engine = load_engine(&db, &config);

    // Time passed while no process was running.
    if let Some(completion) = engine.catch_up(Utc::now()) {
        print_json(&completion.event())?;
        print_json(&record(store.as_ref(), completion).await)?;
    }

    let now = Utc::now();
    match action {
        TimerAction::Start => match engine.start(now) {
            Some(event) => print_json(&event)?,
            None => print_json(&engine.snapshot(now))?,
        },
        TimerAction::Pause => match engine.pause(now) {
            Some(event) => print_json(&event)?,
            None => print_json(&engine.snapshot(now))?,
        },
        TimerAction::Reset => print_json(&engine.reset(now))?,
        TimerAction::Status => print_json(&engine.snapshot(now))?,
        TimerAction::Mode { mode } => print_json(&engine.select_mode(mode, now))?,
        TimerAction::Run { mode } => {
            if let Some(mode) = mode {
                engine.select_mode(mode, now);
            }
            // The driver owns the countdown from here.
            engine.pause(now);
            engine = run_foreground(engine, store).await?;
        }
    }

    save_engine(&db, &engine)?;
    Ok(())
}

async fn run_foreground(engine: TimerEngine, store: Arc<dyn SessionStore>) -> CliResult<TimerEngine> {
    let driver = TimerDriver::new(engine, store.clone());
    let mut events = driver.subscribe();
    let mut stdout = std::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    driver.start().await;

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(Event::TimerTick { mode, remaining_secs, .. }) => {
                    write!(stdout, "\r{} {}", mode.label(), format_clock(remaining_secs))?;
                    stdout.flush()?;
                }
                Ok(Event::TimerCompleted { mode, next_mode, .. }) => {
                    writeln!(stdout, "\r{} complete, next: {}", mode.label(), next_mode.label())?;
                }
                Ok(Event::SessionRecorded { .. }) => {
                    let mut history = SessionHistory::new();
                    history.record_created(store.as_ref()).await;
                    write!(stdout, "{}", history.render())?;
                    break;
                }
                Ok(Event::SessionRecordFailed { error, .. }) => {
                    eprintln!("warning: session was not recorded: {error}");
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event receiver lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => {
                driver.pause().await;
                writeln!(stdout)?;
                break;
            }
        }
    }

    Ok(driver.engine().await)
}
