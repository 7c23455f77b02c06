//! ServerSage - panel registry sync
//!
//! Main entry point: reconciles the local server registry against the panel.

use serversage::{
    config_store::{ConfigStore, SqliteConfigStore},
    state::{AppConfig, AppState},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "serversage=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ServerSage v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        panel_base_url = %config.panel_base_url,
        database_url = %config.database_url,
        request_timeout_secs = config.request_timeout.as_secs(),
        sync_interval_secs = ?config.sync_interval.map(|d| d.as_secs()),
        "Configuration loaded"
    );

    // Open the config database
    let sqlite = SqliteConfigStore::connect(&config.database_url).await?;
    tracing::info!("Database connected");

    let store: Arc<dyn ConfigStore> = Arc::new(sqlite.clone());
    let state = AppState::build(config, store).await?;

    match state.config.sync_interval {
        Some(interval) => {
            let reconciler = state.reconciler.clone();
            tokio::select! {
                _ = reconciler.start_periodic_sync(Some(interval)) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                }
            }
        }
        None => match state.reconciler.reconcile().await {
            Ok(report) => {
                for server in &report.servers {
                    tracing::info!(
                        local_key = %server.local_key,
                        server_id = %server.remote_id,
                        name = %server.name,
                        hidden = server.hidden,
                        "Registry entry"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Registry sync failed");
                state.shutdown().await;
                sqlite.close().await;
                return Err(e.into());
            }
        },
    }

    state.shutdown().await;
    sqlite.close().await;
    tracing::info!("ServerSage stopped");
    Ok(())
}
