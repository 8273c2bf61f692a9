use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefreshToken {
    pub async fn create(
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query("INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_hash(token_hash: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Atomically revoke a live token, returning its owner. A token can be consumed once.
    pub async fn consume(token_hash: &str, pool: &PgPool) -> Result<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, updated_at = NOW()
            WHERE token_hash = $1 AND is_revoked = FALSE AND expires_at > NOW()
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Revoke a live token owned by `user_id`. Tokens of other users are left alone.
    pub async fn revoke(token_hash: &str, user_id: Uuid, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = TRUE, updated_at = NOW() WHERE token_hash = $1 AND user_id = $2 AND is_revoked = FALSE",
        )
        .bind(token_hash)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub async fn create(
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_hash(token_hash: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM password_reset_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// In one transaction: mark the token used, set the new password hash and
    /// revoke every refresh token of the user. Returns false if the token was
    /// used concurrently.
    pub async fn redeem(&self, new_password_hash: &str, pool: &PgPool) -> Result<bool> {
        let mut tx = pool.begin().await?;

        let marked = sqlx::query(
            "UPDATE password_reset_tokens SET used = TRUE, updated_at = NOW() WHERE id = $1 AND used = FALSE",
        )
        .bind(self.id)
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET hashed_password = $2, updated_at = NOW() WHERE id = $1")
            .bind(self.user_id)
            .bind(new_password_hash)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = TRUE, updated_at = NOW() WHERE user_id = $1 AND is_revoked = FALSE",
        )
        .bind(self.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
