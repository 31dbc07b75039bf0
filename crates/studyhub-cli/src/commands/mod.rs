pub mod config;
pub mod history;
pub mod timer;

use std::sync::Arc;

use studyhub_core::{Config, Database, HttpSessionStore, SessionStore};
use tracing::debug;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Session store for this invocation: the remote API when `client.api_url`
/// is set, otherwise the local database.
pub fn open_store(config: &Config) -> CliResult<Arc<dyn SessionStore>> {
    match config.api_url() {
        Some(url) => {
            debug!(url, "using remote session store");
            Ok(Arc::new(HttpSessionStore::new(url)))
        }
        None => Ok(Arc::new(open_local(config)?)),
    }
}

pub fn open_local(config: &Config) -> CliResult<Database> {
    Ok(Database::open(config)?)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
