use clap::Subcommand;
use studyhub_core::{Config, SessionHistory, DEFAULT_LIST_LIMIT};

use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List completed sessions, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Maximum number of sessions
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Delete every recorded session
    Clear,
    /// Delete one session by id
    Delete {
        /// Session ID
        id: String,
    },
}

pub async fn run(action: HistoryAction) -> CliResult {
    let config = Config::load()?;
    let store = open_store(&config)?;

    match action {
        HistoryAction::List { json, limit } => {
            let sessions = store.list(limit).await?;
            if json {
                print_json(&sessions)?;
            } else {
                print!("{}", SessionHistory::from(sessions).render());
            }
        }
        HistoryAction::Clear => {
            let mut history = SessionHistory::new();
            history.clear(store.as_ref()).await?;
            println!("All sessions cleared");
        }
        HistoryAction::Delete { id } => {
            store.delete(&id).await?;
            println!("Session deleted: {id}");
        }
    }
    Ok(())
}
