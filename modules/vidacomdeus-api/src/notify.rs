use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

/// Delivers password reset tokens to their owners.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset(&self, user_id: Uuid, email: &str, token: &str) -> anyhow::Result<()>;
}

/// Records that a reset was requested. The token itself is never written out.
pub struct LogResetNotifier;

#[async_trait]
impl ResetNotifier for LogResetNotifier {
    async fn send_reset(&self, user_id: Uuid, _email: &str, _token: &str) -> anyhow::Result<()> {
        info!(user_id = %user_id, "Password reset requested");
        Ok(())
    }
}
