use anyhow::Context;
use tracing::info;

use crate::app::app;
use crate::config::AppConfig;
use crate::database::{self, schema};
use crate::state::AppState;
use crate::storage::FileStore;

/// Connect, migrate, prepare the upload layout and serve until interrupted.
pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting Integriting API in {:?} mode", config.environment);

    let store = database::connect(&config.database)
        .await
        .context("failed to open the database")?;
    schema::migrate(store.as_ref(), &config.admin)
        .await
        .context("failed to prepare the schema")?;
    FileStore::new(config.uploads.clone())
        .ensure_layout()
        .await
        .context("failed to prepare the upload directories")?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    let shutdown_store = store.clone();
    let router = app(AppState::new(store, config));
    info!("Integriting API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    shutdown_store.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
