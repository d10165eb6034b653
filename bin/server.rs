// Clinica - Web Server
// JSON pages + form endpoints over the SQLite store

use anyhow::{Context, Result};
use clinica::config::Config;
use clinica::server::{router, AppState};
use clinica::store::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    clinica::logging::init(&config.log_filter);

    tracing::info!(version = clinica::VERSION, "🌐 Clinica web server starting");

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    tracing::info!(path = ?config.database_path, "database opened");

    let state = AppState::new(store, config.recent_window);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "🚀 server running");

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
