use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub avatar_url: Option<String>,
    pub plan: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub membership_since: String,
    pub plan: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            membership_since: user.created_at.year().to_string(),
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
            plan: user.plan,
        }
    }
}

impl User {
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Insert a new user. Returns `None` when the e-mail is already registered.
    pub async fn create(
        name: &str,
        email: &str,
        hashed_password: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO users (name, email, hashed_password)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Update only the supplied profile fields.
    pub async fn update_profile(
        id: Uuid,
        name: Option<&str>,
        avatar_url: Option<&str>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                avatar_url = COALESCE($3, avatar_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(avatar_url)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserSettings {
    pub theme: String,
    pub ai_insights: bool,
    pub biblical_reminders: bool,
    pub rag_memory: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub theme: Option<String>,
    pub ai_insights: Option<bool>,
    pub biblical_reminders: Option<bool>,
    pub rag_memory: Option<bool>,
}

impl UserSettings {
    /// Fetch the settings row, creating it with defaults on first access.
    pub async fn get_or_create(user_id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query("INSERT INTO user_settings (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(pool)
            .await?;

        sqlx::query_as::<_, Self>(
            "SELECT theme, ai_insights, biblical_reminders, rag_memory FROM user_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn update(user_id: Uuid, patch: &SettingsPatch, pool: &PgPool) -> Result<Self> {
        Self::get_or_create(user_id, pool).await?;

        sqlx::query_as::<_, Self>(
            r#"
            UPDATE user_settings
            SET theme = COALESCE($2, theme),
                ai_insights = COALESCE($3, ai_insights),
                biblical_reminders = COALESCE($4, biblical_reminders),
                rag_memory = COALESCE($5, rag_memory),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING theme, ai_insights, biblical_reminders, rag_memory
            "#,
        )
        .bind(user_id)
        .bind(patch.theme.as_deref())
        .bind(patch.ai_insights)
        .bind(patch.biblical_reminders)
        .bind(patch.rag_memory)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}
