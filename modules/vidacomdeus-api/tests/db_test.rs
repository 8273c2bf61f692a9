//! Repository tests against Postgres.
//! Set DATABASE_TEST_URL or these tests are skipped. Every test writes its own
//! users and source URLs so they can share one database.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vidacomdeus_api::chat::{self, FallbackResponder, FALLBACK_ANSWER};
use vidacomdeus_api::db::models::chat::{ChatMessage, Citation, Conversation};
use vidacomdeus_api::db::models::library::{LibraryEntry, LibraryFilter};
use vidacomdeus_api::db::models::post::Post;
use vidacomdeus_api::db::models::storage::StorageSnapshot;
use vidacomdeus_api::db::models::token::RefreshToken;
use vidacomdeus_api::db::models::user::User;
use vidacomdeus_api::etl::{run_etl, ReportStatus};
use vidacomdeus_api::MIGRATOR;
use vidacomdeus_common::{ChatRole, LibraryTab};
use vidacomdeus_scraper::{PostSource, ScrapeError, ScrapedPost};

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    MIGRATOR.run(&pool).await.ok()?;
    Some(pool)
}

async fn test_user(pool: &PgPool) -> User {
    let email = format!("{}@teste.com", Uuid::new_v4().simple());
    User::create("Ana Souza", &email, "not-a-real-hash", pool)
        .await
        .unwrap()
        .unwrap()
}

fn scraped(slug: &str, tags: &[&str]) -> ScrapedPost {
    ScrapedPost {
        title: format!("Reflexão {slug}"),
        reference: "Salmos 23:1".to_string(),
        category: "Devocional".to_string(),
        date: "25/10/2024".to_string(),
        thumbnail_url: None,
        source_url: format!("https://www.wgospel.com/tempoderefletir/{slug}/"),
        verse_content: "O Senhor é o meu pastor; nada me faltará.".to_string(),
        body_text: "Primeira frase da reflexão. Segunda frase.".to_string(),
        ai_summary: "Resumo.".to_string(),
        devotional_meditation: "Medite.".to_string(),
        devotional_prayer: "Senhor, guia-me.".to_string(),
        audio_url: None,
        audio_duration: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

#[tokio::test]
async fn upsert_is_keyed_by_source_url() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let slug = Uuid::new_v4().simple().to_string();
    let tag = format!("tag-{slug}");

    let (id, created) = Post::upsert(&scraped(&slug, &[&tag, "Paz"]), &pool).await.unwrap();
    assert!(created);

    let mut changed = scraped(&slug, &["Paz", &tag]);
    changed.title = "Título revisado".to_string();
    let (again, created) = Post::upsert(&changed, &pool).await.unwrap();
    assert_eq!(again, id);
    assert!(!created);

    let post = Post::find_by_id(id, None, &pool).await.unwrap().unwrap();
    assert_eq!(post.title, "Título revisado");
    assert_eq!(post.tags, vec!["Paz".to_string(), tag.clone()]);
    assert!(!post.is_starred);

    let tagged = Post::list(None, Some(&tag), None, None, &pool).await.unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].id, id);

    let by_title = Post::list(Some("revisado"), Some(&tag), None, None, &pool).await.unwrap();
    assert_eq!(by_title.len(), 1);
    let none = Post::list(Some("100%"), Some(&tag), None, None, &pool).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn favorites_flow() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let user = test_user(&pool).await;
    let slug = Uuid::new_v4().simple().to_string();
    let (post_id, _) = Post::upsert(&scraped(&slug, &["Fé"]), &pool).await.unwrap();

    LibraryEntry::add_favorite(user.id, post_id, &pool).await.unwrap();
    LibraryEntry::add_favorite(user.id, post_id, &pool).await.unwrap();

    let favorites = LibraryEntry::list(user.id, LibraryTab::Favorites, &LibraryFilter::default(), &pool)
        .await
        .unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].post_id, post_id);

    let post = Post::find_by_id(post_id, Some(user.id), &pool).await.unwrap().unwrap();
    assert!(post.is_starred);

    assert!(LibraryEntry::remove_favorite(user.id, post_id, &pool).await.unwrap());
    assert!(!LibraryEntry::remove_favorite(user.id, post_id, &pool).await.unwrap());

    LibraryEntry::record_reading(user.id, post_id, &pool).await.unwrap();
    LibraryEntry::record_reading(user.id, post_id, &pool).await.unwrap();
    let history = LibraryEntry::list(user.id, LibraryTab::History, &LibraryFilter::default(), &pool)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn conversation_keeps_citations_in_order() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let user = test_user(&pool).await;
    let conversation = Conversation::create(user.id, &pool).await.unwrap();

    let other = test_user(&pool).await;
    assert!(Conversation::find_owned(conversation.id, other.id, &pool)
        .await
        .unwrap()
        .is_none());

    ChatMessage::append(conversation.id, ChatRole::User, "Como ter paz?", &[], &pool)
        .await
        .unwrap();
    let citations = vec![
        Citation {
            reference: "João 14:27".to_string(),
            book: "João".to_string(),
            chapter: 14,
            verse: "27".to_string(),
        },
        Citation {
            reference: "Filipenses 4:6-7".to_string(),
            book: "Filipenses".to_string(),
            chapter: 4,
            verse: "6-7".to_string(),
        },
    ];
    ChatMessage::append(conversation.id, ChatRole::Assistant, "Leia João 14:27.", &citations, &pool)
        .await
        .unwrap();

    let messages = ChatMessage::list_with_citations(conversation.id, &pool).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::User);
    assert!(messages[0].citations.is_empty());
    assert_eq!(messages[1].citations, citations);

    let stored = Conversation::find_owned(conversation.id, user.id, &pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.message_count, 2);
    assert_eq!(stored.last_message_preview.as_deref(), Some("Leia João 14:27."));
}

#[tokio::test]
async fn send_message_falls_back_without_a_model() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let user = test_user(&pool).await;
    let conversation = Conversation::create(user.id, &pool).await.unwrap();

    let exchange = chat::send_message(conversation.id, "Estou ansioso.", &FallbackResponder, &pool)
        .await
        .unwrap();
    assert_eq!(exchange.user_message.content, "Estou ansioso.");
    assert_eq!(exchange.assistant_message.content, FALLBACK_ANSWER);
    assert!(!exchange.assistant_message.citations.is_empty());
}

#[tokio::test]
async fn refresh_token_is_consumed_once() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let user = test_user(&pool).await;
    let hash = Uuid::new_v4().simple().to_string();
    RefreshToken::create(user.id, &hash, Utc::now() + Duration::days(7), &pool)
        .await
        .unwrap();

    assert_eq!(RefreshToken::consume(&hash, &pool).await.unwrap(), Some(user.id));
    assert_eq!(RefreshToken::consume(&hash, &pool).await.unwrap(), None);

    let expired = Uuid::new_v4().simple().to_string();
    RefreshToken::create(user.id, &expired, Utc::now() - Duration::minutes(1), &pool)
        .await
        .unwrap();
    assert_eq!(RefreshToken::consume(&expired, &pool).await.unwrap(), None);
}

#[tokio::test]
async fn logout_revokes_only_own_tokens() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let owner = test_user(&pool).await;
    let intruder = test_user(&pool).await;
    let hash = Uuid::new_v4().simple().to_string();
    RefreshToken::create(owner.id, &hash, Utc::now() + Duration::days(7), &pool)
        .await
        .unwrap();

    assert!(!RefreshToken::revoke(&hash, intruder.id, &pool).await.unwrap());
    let token = RefreshToken::find_by_hash(&hash, &pool).await.unwrap().unwrap();
    assert!(!token.is_revoked);

    assert!(RefreshToken::revoke(&hash, owner.id, &pool).await.unwrap());
    assert!(!RefreshToken::revoke(&hash, owner.id, &pool).await.unwrap());
}

#[tokio::test]
async fn growth_window_is_seven_calendar_days() {
    let Some(pool) = test_pool().await else {
        return;
    };
    // The only test touching this table.
    sqlx::query("TRUNCATE storage_snapshots")
        .execute(&pool)
        .await
        .unwrap();

    let midnight = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
    for days_ago in 0..=7 {
        for hour in [0, 18] {
            let measured_at = midnight - Duration::days(days_ago) + Duration::hours(hour);
            let used = 1_000 * (8 - days_ago) + hour;
            sqlx::query(
                "INSERT INTO storage_snapshots (measured_at, used_bytes, total_bytes) VALUES ($1, $2, $3)",
            )
            .bind(measured_at)
            .bind(used)
            .bind(10_000_i64)
            .execute(&pool)
            .await
            .unwrap();
        }
    }

    let daily = StorageSnapshot::daily_last_week(&pool).await.unwrap();
    assert_eq!(daily.len(), 7);
    assert_eq!(daily[0].measured_at, midnight - Duration::days(6) + Duration::hours(18));
    assert_eq!(daily[6].measured_at, midnight + Duration::hours(18));
    assert!(daily.iter().all(|s| s.used_bytes % 1_000 == 18));
}

struct FixedSource {
    url: String,
    posts: Vec<ScrapedPost>,
}

#[async_trait]
impl PostSource for FixedSource {
    async fn fetch_posts(&self) -> Result<Vec<ScrapedPost>, ScrapeError> {
        Ok(self.posts.clone())
    }

    fn source_url(&self) -> &str {
        &self.url
    }
}

#[tokio::test]
async fn etl_counts_new_posts() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let first = Uuid::new_v4().simple().to_string();
    let second = Uuid::new_v4().simple().to_string();
    let source = FixedSource {
        url: "https://www.wgospel.com/tempoderefletir/".to_string(),
        posts: vec![scraped(&first, &[]), scraped(&second, &[])],
    };

    let report = run_etl(&pool, &source).await;
    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!((report.posts_collected, report.new_posts), (2, 2));

    let report = run_etl(&pool, &source).await;
    assert_eq!((report.posts_collected, report.new_posts), (2, 0));
}
