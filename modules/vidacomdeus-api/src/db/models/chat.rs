use std::collections::HashMap;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use vidacomdeus_common::time::to_iso;
use vidacomdeus_common::ChatRole;

const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message_count: i32,
    pub last_message_preview: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
    pub message_count: i32,
    pub last_message_preview: Option<String>,
}

impl From<Conversation> for ConversationView {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id.to_string(),
            user_id: c.user_id.to_string(),
            created_at: to_iso(c.created_at),
            message_count: c.message_count,
            last_message_preview: c.last_message_preview,
        }
    }
}

impl Conversation {
    pub async fn create(user_id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("INSERT INTO chat_conversations (user_id) VALUES ($1) RETURNING *")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn list_for_user(user_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM chat_conversations WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// A conversation owned by someone else reads as missing.
    pub async fn find_owned(id: Uuid, user_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM chat_conversations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Citation {
    pub reference: String,
    pub book: String,
    pub chapter: i32,
    pub verse: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub citations: Vec<Citation>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct CitationRow {
    message_id: Uuid,
    reference: String,
    book: String,
    chapter: i32,
    verse: String,
}

impl ChatMessage {
    pub fn role(&self) -> Result<ChatRole> {
        self.role
            .parse()
            .map_err(|e| anyhow!("chat message {} has bad role: {e}", self.id))
    }

    fn into_view(self, citations: Vec<Citation>) -> Result<MessageView> {
        Ok(MessageView {
            role: self.role()?,
            id: self.id.to_string(),
            content: self.content,
            citations,
            created_at: to_iso(self.created_at),
        })
    }

    /// Every message of a conversation in chronological order, with citations.
    pub async fn list_with_citations(conversation_id: Uuid, pool: &PgPool) -> Result<Vec<MessageView>> {
        let messages = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM chat_messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await?;

        let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        let rows = sqlx::query_as::<_, CitationRow>(
            r#"
            SELECT message_id, reference, book, chapter, verse
            FROM chat_citations
            WHERE message_id = ANY($1)
            ORDER BY position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut by_message: HashMap<Uuid, Vec<Citation>> = HashMap::new();
        for row in rows {
            by_message.entry(row.message_id).or_default().push(Citation {
                reference: row.reference,
                book: row.book,
                chapter: row.chapter,
                verse: row.verse,
            });
        }

        messages
            .into_iter()
            .map(|m| {
                let citations = by_message.remove(&m.id).unwrap_or_default();
                m.into_view(citations)
            })
            .collect()
    }

    /// The last `limit` messages of a conversation, oldest first.
    pub async fn recent(conversation_id: Uuid, limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let mut messages = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM chat_messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        messages.reverse();
        Ok(messages)
    }

    /// Store a message with its citations and bump the conversation counters.
    pub async fn append(
        conversation_id: Uuid,
        role: ChatRole,
        content: &str,
        citations: &[Citation],
        pool: &PgPool,
    ) -> Result<MessageView> {
        let mut tx = pool.begin().await?;

        let message = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO chat_messages (conversation_id, role, content)
            VALUES ($1, $2, $3)
            RETURNING id, conversation_id, role, content, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        if !citations.is_empty() {
            let references: Vec<&str> = citations.iter().map(|c| c.reference.as_str()).collect();
            let books: Vec<&str> = citations.iter().map(|c| c.book.as_str()).collect();
            let chapters: Vec<i32> = citations.iter().map(|c| c.chapter).collect();
            let verses: Vec<&str> = citations.iter().map(|c| c.verse.as_str()).collect();

            sqlx::query(
                r#"
                INSERT INTO chat_citations (message_id, reference, book, chapter, verse, position)
                SELECT $1, c.reference, c.book, c.chapter, c.verse, (c.ord - 1)::int
                FROM UNNEST($2::text[], $3::text[], $4::int[], $5::text[])
                    WITH ORDINALITY AS c(reference, book, chapter, verse, ord)
                "#,
            )
            .bind(message.id)
            .bind(&references)
            .bind(&books)
            .bind(&chapters)
            .bind(&verses)
            .execute(&mut *tx)
            .await?;
        }

        let preview = (role == ChatRole::Assistant).then(|| preview(content));
        sqlx::query(
            r#"
            UPDATE chat_conversations
            SET message_count = message_count + 1,
                last_message_preview = COALESCE($2, last_message_preview),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(preview)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        message.into_view(citations.to_vec())
    }
}

fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "ç".repeat(200);
        assert_eq!(preview(&long).chars().count(), 120);
        assert_eq!(preview("Amém"), "Amém");
    }

    #[test]
    fn message_view_parses_role() {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            role: "assistant".to_string(),
            content: "Leia João 3:16.".to_string(),
            created_at: Utc::now(),
        };
        let view = message.into_view(vec![]).unwrap();
        assert_eq!(view.role, ChatRole::Assistant);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json["citations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn unknown_role_is_an_error() {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            role: "system".to_string(),
            content: String::new(),
            created_at: Utc::now(),
        };
        assert!(message.role().is_err());
    }

    #[test]
    fn conversation_view_formats_timestamps() {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            message_count: 2,
            last_message_preview: Some("Provérbios 3:5-6".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let view = ConversationView::from(conversation);
        assert!(view.created_at.ends_with('Z'));
        assert_eq!(view.message_count, 2);
    }
}
