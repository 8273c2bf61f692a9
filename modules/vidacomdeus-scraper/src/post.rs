use serde::{Deserialize, Serialize};

use crate::detail::DetailContent;
use crate::listing::ListingItem;
use crate::reference::parse_excerpt_reference;

pub const CATEGORY: &str = "Tempo de Refletir";
pub const DEFAULT_TAGS: [&str; 2] = ["Reflexão", "Devocional"];
pub const DEFAULT_MEDITATION: &str = "Reflita sobre esta passagem ao longo do dia.";
pub const DEFAULT_PRAYER: &str = "Senhor, obrigado pela Tua palavra. Amém.";

/// A devotional post ready to be upserted, keyed by `source_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPost {
    pub title: String,
    pub reference: String,
    pub category: String,
    pub date: String,
    pub thumbnail_url: Option<String>,
    pub source_url: String,
    pub verse_content: String,
    pub body_text: String,
    pub ai_summary: String,
    pub devotional_meditation: String,
    pub devotional_prayer: String,
    pub audio_url: Option<String>,
    pub audio_duration: Option<String>,
    pub tags: Vec<String>,
}

impl ScrapedPost {
    /// Merge a listing entry with its detail page, filling the gaps with defaults.
    pub fn assemble(item: &ListingItem, detail: DetailContent) -> Self {
        let (reference, verse_snippet) = parse_excerpt_reference(&item.excerpt);

        let verse_content = if detail.verse_content.is_empty() {
            verse_snippet
        } else {
            detail.verse_content
        };

        let ai_summary = detail
            .body_text
            .split("\n\n")
            .next()
            .unwrap_or_default()
            .to_string();

        let devotional_meditation = if detail.body_text.is_empty() {
            DEFAULT_MEDITATION.to_string()
        } else {
            detail.body_text.clone()
        };

        let devotional_prayer = if detail.devotional_prayer.is_empty() {
            DEFAULT_PRAYER.to_string()
        } else {
            detail.devotional_prayer
        };

        Self {
            title: item.title.clone(),
            reference,
            category: CATEGORY.to_string(),
            date: item.date.clone(),
            thumbnail_url: item.thumbnail_url.clone(),
            source_url: item.href.clone(),
            verse_content,
            body_text: detail.body_text,
            ai_summary,
            devotional_meditation,
            devotional_prayer,
            audio_url: detail.audio_url,
            audio_duration: detail.audio_duration,
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> ListingItem {
        ListingItem {
            title: "Coragem para recomeçar".to_string(),
            href: "https://www.wgospel.com/tempoderefletir/coragem".to_string(),
            date: "21 de fevereiro de 2026".to_string(),
            excerpt: "Josué 1:9 - Sê forte e corajoso".to_string(),
            thumbnail_url: None,
        }
    }

    #[test]
    fn empty_detail_uses_listing_and_defaults() {
        let post = ScrapedPost::assemble(&item(), DetailContent::default());
        assert_eq!(post.reference, "Josué 1:9");
        assert_eq!(post.verse_content, "Sê forte e corajoso");
        assert_eq!(post.body_text, "");
        assert_eq!(post.ai_summary, "");
        assert_eq!(post.devotional_meditation, DEFAULT_MEDITATION);
        assert_eq!(post.devotional_prayer, DEFAULT_PRAYER);
        assert_eq!(post.category, CATEGORY);
        assert_eq!(post.tags, vec!["Reflexão", "Devocional"]);
        assert_eq!(post.source_url, item().href);
    }

    #[test]
    fn detail_content_wins() {
        let detail = DetailContent {
            verse_content: "Josué 1:9 - Não to mandei eu?".to_string(),
            body_text: "Primeiro parágrafo.\n\nSegundo parágrafo.".to_string(),
            devotional_prayer: "Pai, dá-me coragem.".to_string(),
            audio_url: Some("https://eucompartilho.com/TempoDeRefletir/4321.mp3".to_string()),
            audio_duration: Some("4:12".to_string()),
        };
        let post = ScrapedPost::assemble(&item(), detail);
        assert_eq!(post.verse_content, "Josué 1:9 - Não to mandei eu?");
        assert_eq!(post.ai_summary, "Primeiro parágrafo.");
        assert_eq!(post.devotional_meditation, "Primeiro parágrafo.\n\nSegundo parágrafo.");
        assert_eq!(post.devotional_prayer, "Pai, dá-me coragem.");
        assert_eq!(post.audio_duration.as_deref(), Some("4:12"));
    }
}
