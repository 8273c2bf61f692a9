use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use vidacomdeus_api::{init_tracing, router, snapshot, AppState, MIGRATOR};
use vidacomdeus_common::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = Config::from_env()?;
    info!(
        app = %config.app_name,
        version = %config.app_version,
        environment = %config.environment,
        "Starting API"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    // Idempotent
    MIGRATOR.run(&pool).await?;
    info!("Migrations applied");

    let addr = config.bind_addr();
    let snapshot_interval = Duration::from_secs(config.storage_snapshot_interval_secs.max(1));
    let total_bytes = config.render_db_size_bytes;

    let state = Arc::new(AppState::from_config(config, pool.clone()).await?);
    let snapshots = snapshot::spawn_snapshot_task(pool, total_bytes, snapshot_interval);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    snapshots.abort();
    info!("API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
