#![forbid(unsafe_code)]

use std::sync::Arc;

use studyhub_core::logging::init_tracing;
use studyhub_core::{Config, Database};
use studyhub_server::{build_router, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info");

    let config = Config::load()?.with_env_overrides();
    let db = Database::open(&config)?;
    info!(path = %config.database_path()?.display(), "database ready");

    let state = AppState::new(
        Arc::new(db),
        config.server.environment.clone(),
        &config.server.cors_origin,
    );
    let app = build_router(state);

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "StudyHub API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
