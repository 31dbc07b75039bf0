mod config;
pub mod database;
pub mod http;
mod store;

pub use config::{ClientConfig, Config, ServerConfig, TimerConfig};
pub use database::Database;
pub use http::HttpSessionStore;
pub use store::{clamp_limit, SessionStore, DEFAULT_LIST_LIMIT};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the StudyHub data directory, creating it if needed.
///
/// `STUDYHUB_DATA_DIR` wins when set. Otherwise `~/.config/studyhub`, or
/// `~/.config/studyhub-dev` when `STUDYHUB_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STUDYHUB_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYHUB_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studyhub-dev")
            } else {
                base_dir.join("studyhub")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
