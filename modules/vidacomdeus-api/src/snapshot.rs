use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::models::storage::StorageSnapshot;

/// Measure the database and store one snapshot.
pub async fn take_snapshot(pool: &PgPool, total_bytes: i64) -> anyhow::Result<StorageSnapshot> {
    let used_bytes = StorageSnapshot::database_size(pool).await?;
    StorageSnapshot::record(used_bytes, total_bytes, pool).await
}

/// Record a snapshot now and then every `interval`, until the runtime shuts down.
pub fn spawn_snapshot_task(pool: PgPool, total_bytes: i64, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match take_snapshot(&pool, total_bytes).await {
                Ok(snapshot) => debug!(used_bytes = snapshot.used_bytes, "Storage snapshot recorded"),
                Err(e) => warn!(error = %e, "Storage snapshot failed"),
            }
        }
    })
}
