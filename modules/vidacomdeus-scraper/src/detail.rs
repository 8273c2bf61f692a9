use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::reference::has_verse_reference;
use crate::text::{char_len, joined_text};

const MIN_PARAGRAPH_CHARS: usize = 10;

const PROMO_MARKERS: &[&str] = &[
    "Saiba como receber",
    "No celular, instale",
    "Para ver/ouvir no",
    "Tenha os nossos aplicativos",
    "Para receber pelo WhatsApp",
    "Participe do nosso canal",
    "Instagram:",
    "Threads:",
    "X (Antigo Twitter):",
    "Facebook:",
    "PIX",
    "manah@wgospel.com",
];

const PRAYER_OPENINGS: [&str; 4] = ["Pai,", "Senhor,", "Deus,", "Jesus,"];

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static CSS selector"));
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("static CSS selector"));
static AUDIO_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)eucompartilho\.com/TempoDeRefletir/").expect("audio regex"));
static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration:\s*([\d:]+)").expect("duration regex"));
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TEMPO DE REFLETIR \d+").expect("header regex"));

/// Content extracted from a single devotional page. Empty strings mean "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailContent {
    pub verse_content: String,
    pub body_text: String,
    pub devotional_prayer: String,
    pub audio_url: Option<String>,
    pub audio_duration: Option<String>,
}

pub fn parse_detail(html: &str) -> DetailContent {
    let document = Html::parse_document(html);
    let mut detail = DetailContent::default();

    let audio = document.select(&ANCHOR).find(|a| {
        a.value()
            .attr("href")
            .is_some_and(|href| AUDIO_HREF_RE.is_match(href))
    });
    if let Some(anchor) = audio {
        detail.audio_url = anchor.value().attr("href").map(str::to_string);
        detail.audio_duration = duration_after(&document, &anchor);
    }

    let paragraphs: Vec<String> = document
        .select(&PARAGRAPH)
        .map(|p| joined_text(&p, " "))
        .filter(|text| is_content(text))
        .collect();

    if paragraphs.is_empty() {
        return detail;
    }

    let mut content: &[String] = match paragraphs.iter().position(|p| HEADER_RE.is_match(p)) {
        Some(header) => &paragraphs[header + 1..],
        None => &paragraphs,
    };

    if let Some(first) = content.first() {
        if has_verse_reference(first) {
            detail.verse_content = first.clone();
            content = &content[1..];
        }
    }

    let body = match content.iter().position(|p| opens_prayer_section(p)) {
        Some(idx) => {
            detail.devotional_prayer = pick_prayer(&content[idx..]).unwrap_or_default();
            &content[..idx]
        }
        None => content,
    };

    detail.body_text = body.join("\n\n");
    detail
}

fn is_content(text: &str) -> bool {
    char_len(text) >= MIN_PARAGRAPH_CHARS
        && !PROMO_MARKERS.iter().any(|marker| text.contains(marker))
        && !text.starts_with("Podcast:")
        && !text.starts_with("Subscribe:")
}

fn opens_prayer_section(paragraph: &str) -> bool {
    let lower = paragraph.to_lowercase();
    lower.contains("ore comigo") || lower.contains("reflita sobre isso")
}

/// First paragraph that opens like a prayer, else the first one that is not an intro line.
fn pick_prayer(section: &[String]) -> Option<String> {
    for p in section {
        if PRAYER_OPENINGS.iter().any(|opening| p.starts_with(opening)) {
            return Some(p.clone());
        }
        let lower = p.to_lowercase();
        if lower.contains("ore comigo") || lower.contains("reflita sobre") {
            continue;
        }
        return Some(p.clone());
    }
    None
}

/// First `Duration: h:mm` text node at or after `anchor`, in document order.
fn duration_after(document: &Html, anchor: &ElementRef) -> Option<String> {
    document
        .tree
        .root()
        .descendants()
        .skip_while(|node| node.id() != anchor.id())
        .find_map(|node| {
            let text = node.value().as_text()?;
            DURATION_RE.captures(text).map(|caps| caps[1].to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div class="podcast">
          <a href="https://EUCOMPARTILHO.com/TempoDeRefletir/4321.mp3">Ouvir</a>
          <span>Podcast: Play in new window</span>
          <p>Duration: 4:12 | 3.9MB</p>
        </div>
        <article>
          <p>TEMPO DE REFLETIR 4321 – 21 de fevereiro de 2026</p>
          <p>Josué 1:9 – Não to mandei eu? Sê forte e corajoso.</p>
          <p>Curto.</p>
          <p>Deus não nos chamou para uma vida de medo, mas de coragem.</p>
          <p>Quando o caminho parece difícil, lembre-se de quem caminha com você.</p>
          <p>Agora ore comigo:</p>
          <p>Pai, obrigado porque Tu estás comigo em todo lugar. Amém.</p>
          <p>Saiba como receber as reflexões diariamente.</p>
          <p>Instagram: @tempoderefletir</p>
        </article>
      </body></html>"#;

    #[test]
    fn parses_full_page() {
        let detail = parse_detail(PAGE);
        assert_eq!(
            detail.audio_url.as_deref(),
            Some("https://EUCOMPARTILHO.com/TempoDeRefletir/4321.mp3")
        );
        assert_eq!(detail.audio_duration.as_deref(), Some("4:12"));
        assert_eq!(
            detail.verse_content,
            "Josué 1:9 – Não to mandei eu? Sê forte e corajoso."
        );
        assert_eq!(
            detail.body_text,
            "Deus não nos chamou para uma vida de medo, mas de coragem.\n\n\
             Quando o caminho parece difícil, lembre-se de quem caminha com você."
        );
        assert_eq!(
            detail.devotional_prayer,
            "Pai, obrigado porque Tu estás comigo em todo lugar. Amém."
        );
    }

    #[test]
    fn prayer_falls_back_to_first_non_intro_paragraph() {
        let html = r#"<p>Um parágrafo de reflexão bem longo.</p>
            <p>Reflita sobre isso durante o dia.</p>
            <p>Que a paz de Cristo guarde o seu coração.</p>"#;
        let detail = parse_detail(html);
        assert_eq!(detail.body_text, "Um parágrafo de reflexão bem longo.");
        assert_eq!(detail.devotional_prayer, "Que a paz de Cristo guarde o seu coração.");
        assert_eq!(detail.verse_content, "");
    }

    #[test]
    fn no_prayer_section_means_everything_is_body() {
        let html = r#"<p>Primeiro parágrafo da meditação.</p><p>Segundo parágrafo da meditação.</p>"#;
        let detail = parse_detail(html);
        assert_eq!(
            detail.body_text,
            "Primeiro parágrafo da meditação.\n\nSegundo parágrafo da meditação."
        );
        assert!(detail.devotional_prayer.is_empty());
        assert!(detail.audio_url.is_none());
        assert!(detail.audio_duration.is_none());
    }

    #[test]
    fn empty_page_yields_defaults() {
        assert_eq!(parse_detail("<html></html>"), DetailContent::default());
    }
}
