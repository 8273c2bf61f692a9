use std::sync::LazyLock;

use regex::Regex;

use crate::text::take_chars;

/// `<Book> <chapter>:<verse>[-<verse>] - <text>`, e.g. `Josué 1:9 - Sê forte...`.
pub(crate) static VERSE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)((?:[1-3]\s*)?[A-ZÀ-Ú][a-zà-ú]+(?:\s+[a-zà-ú]+)*)\s+(\d+[.:]\d+(?:\s*[-–]\s*\d+)?)\s*[-–]\s*(.+)",
    )
    .expect("verse reference regex")
});

/// The `TEMPO DE REFLETIR 1234 - 21 de fevereiro de 2026` banner on every post.
static EXCERPT_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"TEMPO DE REFLETIR \d+\s*[-–]\s*\d.*?\d{4}\s*").expect("excerpt header regex")
});

const SNIPPET_CHARS: usize = 200;

/// Split a listing excerpt into `(reference, verse_snippet)`.
///
/// Returns an empty reference and the first 200 characters of the cleaned
/// excerpt when no verse reference is found.
pub fn parse_excerpt_reference(excerpt: &str) -> (String, String) {
    let cleaned = EXCERPT_HEADER_RE.replace_all(excerpt, "");
    let cleaned = cleaned.replace('\u{a0}', " ");
    let cleaned = cleaned.trim();

    if let Some(caps) = VERSE_REF_RE.captures(cleaned) {
        let book = caps[1].trim();
        let chapter_verse = caps[2].trim();
        let verse_text = caps[3]
            .trim()
            .trim_end_matches(['[', '…', ']'])
            .trim();
        return (format!("{book} {chapter_verse}"), verse_text.to_string());
    }

    (String::new(), take_chars(cleaned, SNIPPET_CHARS))
}

pub(crate) fn has_verse_reference(text: &str) -> bool {
    VERSE_REF_RE.is_match(text)
}
