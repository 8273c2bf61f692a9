use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use vidacomdeus_scraper::ScrapedPost;

use super::like_pattern;

/// Posts are "new" for this long after ingestion.
const NEW_WINDOW_HOURS: i64 = 24;
const FEED_SIZE: i64 = 5;

// Tags in stored order plus whether the viewer ($1, nullable) favorited the post.
const POST_COLUMNS: &str = r#"
    p.*,
    ARRAY(SELECT t.name FROM post_tags t WHERE t.post_id = p.id ORDER BY t.position, t.name) AS tags,
    EXISTS(SELECT 1 FROM favorites f WHERE f.post_id = p.id AND f.user_id = $1) AS is_starred
"#;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub reference: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub thumbnail_url: Option<String>,
    pub source_url: Option<String>,
    pub verse_content: Option<String>,
    pub body_text: Option<String>,
    pub ai_summary: Option<String>,
    pub devotional_meditation: Option<String>,
    pub devotional_prayer: Option<String>,
    pub audio_url: Option<String>,
    pub audio_duration: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub is_starred: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub reference: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_new: bool,
    pub is_starred: bool,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyPoint {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub id: String,
    pub title: String,
    pub reference: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub thumbnail_url: Option<String>,
    pub source_url: Option<String>,
    pub verse_content: Option<String>,
    pub body_text: Option<String>,
    pub ai_summary: Option<String>,
    pub key_points: Vec<KeyPoint>,
    pub tags: Vec<String>,
    pub devotional_meditation: Option<String>,
    pub devotional_prayer: Option<String>,
    pub audio_url: Option<String>,
    pub audio_duration: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostAudio {
    pub post_id: String,
    pub url: String,
    pub duration: String,
    pub title: String,
}

impl Post {
    pub fn is_new(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at < Duration::hours(NEW_WINDOW_HOURS)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> PostSummary {
        PostSummary {
            id: self.id.to_string(),
            title: self.title.clone(),
            reference: self.reference.clone(),
            category: self.category.clone(),
            date: self.date.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            is_new: self.is_new(now),
            is_starred: self.is_starred,
            tags: self.tags.clone(),
        }
    }

    pub fn into_detail(self) -> PostDetail {
        let key_points = self.body_text.as_deref().map(key_points).unwrap_or_default();
        PostDetail {
            id: self.id.to_string(),
            title: self.title,
            reference: self.reference,
            category: self.category,
            date: self.date,
            thumbnail_url: self.thumbnail_url,
            source_url: self.source_url,
            verse_content: self.verse_content,
            body_text: self.body_text,
            ai_summary: self.ai_summary,
            key_points,
            tags: self.tags,
            devotional_meditation: self.devotional_meditation,
            devotional_prayer: self.devotional_prayer,
            audio_url: self.audio_url,
            audio_duration: self.audio_duration,
        }
    }

    pub fn into_audio(self) -> PostAudio {
        PostAudio {
            post_id: self.id.to_string(),
            url: self.audio_url.unwrap_or_default(),
            duration: self.audio_duration.unwrap_or_else(|| "0:00".to_string()),
            title: self.title,
        }
    }

    /// The newest posts, used by the home feed.
    pub async fn feed(viewer: Option<Uuid>, pool: &PgPool) -> Result<Vec<Self>> {
        Self::list(None, None, viewer, Some(FEED_SIZE), pool).await
    }

    /// Newest-first listing, optionally filtered by a title substring and an exact tag.
    pub async fn list(
        query: Option<&str>,
        tag: Option<&str>,
        viewer: Option<Uuid>,
        limit: Option<i64>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            WHERE ($2::text IS NULL OR p.title ILIKE $2 ESCAPE '\')
              AND ($3::text IS NULL OR EXISTS (
                    SELECT 1 FROM post_tags t WHERE t.post_id = p.id AND t.name = $3))
            ORDER BY p.created_at DESC
            LIMIT $4
            "#
        );

        sqlx::query_as::<_, Self>(&sql)
            .bind(viewer)
            .bind(query.map(like_pattern))
            .bind(tag)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, viewer: Option<Uuid>, pool: &PgPool) -> Result<Option<Self>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $2");
        sqlx::query_as::<_, Self>(&sql)
            .bind(viewer)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn exists(id: Uuid, pool: &PgPool) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    /// Insert or refresh a scraped post keyed by its source URL and replace its tags.
    /// Returns the post id and whether the row was newly created.
    pub async fn upsert(post: &ScrapedPost, pool: &PgPool) -> Result<(Uuid, bool)> {
        let mut tx = pool.begin().await?;

        // xmax is zero only for rows inserted by this statement.
        let (id, created) = sqlx::query_as::<_, (Uuid, bool)>(
            r#"
            INSERT INTO posts (
                title, reference, category, date, thumbnail_url, source_url,
                verse_content, body_text, ai_summary, devotional_meditation,
                devotional_prayer, audio_url, audio_duration
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (source_url) DO UPDATE SET
                title = EXCLUDED.title,
                reference = EXCLUDED.reference,
                category = EXCLUDED.category,
                date = EXCLUDED.date,
                thumbnail_url = EXCLUDED.thumbnail_url,
                verse_content = EXCLUDED.verse_content,
                body_text = EXCLUDED.body_text,
                ai_summary = EXCLUDED.ai_summary,
                devotional_meditation = EXCLUDED.devotional_meditation,
                devotional_prayer = EXCLUDED.devotional_prayer,
                audio_url = EXCLUDED.audio_url,
                audio_duration = EXCLUDED.audio_duration,
                updated_at = NOW()
            RETURNING id, (xmax = 0) AS created
            "#,
        )
        .bind(&post.title)
        .bind(non_empty(&post.reference))
        .bind(&post.category)
        .bind(non_empty(&post.date))
        .bind(post.thumbnail_url.as_deref())
        .bind(&post.source_url)
        .bind(non_empty(&post.verse_content))
        .bind(non_empty(&post.body_text))
        .bind(non_empty(&post.ai_summary))
        .bind(&post.devotional_meditation)
        .bind(&post.devotional_prayer)
        .bind(post.audio_url.as_deref())
        .bind(post.audio_duration.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO post_tags (post_id, name, position)
            SELECT $1, tag.name, (tag.ord - 1)::int
            FROM UNNEST($2::text[]) WITH ORDINALITY AS tag(name, ord)
            "#,
        )
        .bind(id)
        .bind(&post.tags)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((id, created))
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Split text into sentences at whitespace runs that follow `.`, `!` or `?`.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            sentences.push(&text[start..i]);
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                end = j + next.len_utf8();
                chars.next();
            }
            start = end;
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    sentences.push(&text[start..]);
    sentences
}

/// Up to three highlight sentences from the first five of the body.
pub fn key_points(body: &str) -> Vec<KeyPoint> {
    split_sentences(body)
        .into_iter()
        .take(5)
        .map(str::trim)
        .filter(|s| {
            let len = s.chars().count();
            len > 20 && len < 200
        })
        .take(3)
        .map(|s| KeyPoint { text: s.to_string() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(created_at: DateTime<Utc>) -> Post {
        Post {
            id: Uuid::new_v4(),
            title: "A paz que excede todo entendimento".to_string(),
            reference: Some("Filipenses 4:7".to_string()),
            category: Some("Tempo de Refletir".to_string()),
            date: Some("12 de março de 2024".to_string()),
            thumbnail_url: None,
            source_url: Some("https://www.wgospel.com/tempoderefletir/a-paz/".to_string()),
            verse_content: None,
            body_text: Some(
                "Deus cuida de cada detalhe da nossa vida. Curto. Confie nele hoje e descanse no Seu amor!"
                    .to_string(),
            ),
            ai_summary: None,
            devotional_meditation: None,
            devotional_prayer: None,
            audio_url: None,
            audio_duration: None,
            is_featured: false,
            created_at,
            updated_at: created_at,
            tags: vec!["Reflexão".to_string(), "Devocional".to_string()],
            is_starred: true,
        }
    }

    #[test]
    fn sentences_split_after_terminal_punctuation() {
        assert_eq!(
            split_sentences("Primeira frase.  Segunda? Terceira! fim"),
            vec!["Primeira frase.", "Segunda?", "Terceira!", "fim"]
        );
        assert_eq!(split_sentences("Versículo 3.16 sem espaço"), vec!["Versículo 3.16 sem espaço"]);
    }

    #[test]
    fn key_points_filter_by_length() {
        let points = key_points(
            "Deus cuida de cada detalhe da nossa vida. Curto. Confie nele hoje e descanse no Seu amor!",
        );
        assert_eq!(
            points,
            vec![
                KeyPoint { text: "Deus cuida de cada detalhe da nossa vida.".to_string() },
                KeyPoint { text: "Confie nele hoje e descanse no Seu amor!".to_string() },
            ]
        );
    }

    #[test]
    fn key_points_only_consider_first_five_sentences() {
        let body = "Curta um. Curta dois. Curta três. Curta quatro. Curta cinco. \
                    Esta sexta frase é longa o bastante para contar.";
        assert!(key_points(body).is_empty());

        let many = "Uma frase longa o suficiente para virar destaque. ".repeat(5);
        assert_eq!(key_points(&many).len(), 3);
    }

    #[test]
    fn is_new_within_a_day() {
        let now = Utc::now();
        assert!(post(now - Duration::hours(2)).is_new(now));
        assert!(!post(now - Duration::hours(25)).is_new(now));
    }

    #[test]
    fn detail_and_audio_views() {
        let p = post(Utc::now());
        let audio = p.clone().into_audio();
        assert_eq!(audio.url, "");
        assert_eq!(audio.duration, "0:00");

        let detail = p.into_detail();
        assert_eq!(detail.key_points.len(), 2);
        assert_eq!(detail.tags, vec!["Reflexão", "Devocional"]);
    }

    #[test]
    fn blank_fields_become_null() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" João 3:16 "), Some("João 3:16"));
    }
}
