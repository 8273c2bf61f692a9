use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use vidacomdeus_common::LibraryTab;

use super::like_pattern;

/// How far back a library listing reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    Week,
    Month,
    Quarter,
    #[default]
    All,
}

impl Period {
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
            Period::All => return None,
        };
        Some(now - Duration::days(days))
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(Period::Week),
            "30d" => Ok(Period::Month),
            "90d" => Ok(Period::Quarter),
            "all" => Ok(Period::All),
            other => Err(format!("Período inválido: {other}. Use 7d, 30d, 90d ou all.")),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LibraryEntry {
    pub id: Uuid,
    pub post_id: Uuid,
    pub title: String,
    pub saved_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryItem {
    pub id: String,
    pub post_id: String,
    pub title: String,
    pub subtitle: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub saved_at: String,
    pub tags: Vec<String>,
}

impl From<LibraryEntry> for LibraryItem {
    fn from(entry: LibraryEntry) -> Self {
        let mut subtitle = format!("Salvo em {}", entry.saved_at.format("%d/%m/%Y"));
        if let Some(tag) = entry.tags.first() {
            subtitle.push_str(&format!(" • #{tag}"));
        }
        Self {
            id: entry.id.to_string(),
            post_id: entry.post_id.to_string(),
            title: entry.title,
            subtitle,
            item_type: "post".to_string(),
            saved_at: entry.saved_at.format("%Y-%m-%d").to_string(),
            tags: entry.tags,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LibraryFilter {
    pub query: Option<String>,
    pub tag: Option<String>,
    pub period: Period,
}

impl LibraryEntry {
    /// Favorites or reading history of a user, newest first.
    pub async fn list(
        user_id: Uuid,
        tab: LibraryTab,
        filter: &LibraryFilter,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let table = match tab {
            LibraryTab::Favorites => "favorites",
            LibraryTab::History => "reading_history",
        };

        let sql = format!(
            r#"
            SELECT
                e.id,
                e.post_id,
                p.title,
                e.created_at AS saved_at,
                ARRAY(SELECT t.name FROM post_tags t WHERE t.post_id = p.id ORDER BY t.position, t.name) AS tags
            FROM {table} e
            JOIN posts p ON p.id = e.post_id
            WHERE e.user_id = $1
              AND ($2::text IS NULL OR p.title ILIKE $2 ESCAPE '\')
              AND ($3::text IS NULL OR EXISTS (
                    SELECT 1 FROM post_tags t WHERE t.post_id = p.id AND t.name = $3))
              AND ($4::timestamptz IS NULL OR e.created_at >= $4)
            ORDER BY e.created_at DESC
            "#
        );

        sqlx::query_as::<_, Self>(&sql)
            .bind(user_id)
            .bind(filter.query.as_deref().map(like_pattern))
            .bind(filter.tag.as_deref())
            .bind(filter.period.since(Utc::now()))
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Idempotent: a second favorite of the same post is a no-op.
    pub async fn add_favorite(user_id: Uuid, post_id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "INSERT INTO favorites (user_id, post_id) VALUES ($1, $2) ON CONFLICT (user_id, post_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn remove_favorite(user_id: Uuid, post_id: Uuid, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn record_reading(user_id: Uuid, post_id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("INSERT INTO reading_history (user_id, post_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(post_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
