use std::sync::LazyLock;

use regex::Regex;

use crate::db::models::chat::Citation;

/// Book names of the Protestant canon as written in Portuguese Bibles.
/// Numbered books ("1 Samuel", "2 Reis") are matched through an optional prefix.
pub const BOOKS: [&str; 66] = [
    // Old Testament
    "Gênesis", "Êxodo", "Levítico", "Números", "Deuteronômio", "Josué", "Juízes", "Rute",
    "1 Samuel", "2 Samuel", "1 Reis", "2 Reis", "1 Crônicas", "2 Crônicas", "Esdras",
    "Neemias", "Ester", "Jó", "Salmos", "Provérbios", "Eclesiastes", "Cânticos", "Isaías",
    "Jeremias", "Lamentações", "Ezequiel", "Daniel", "Oséias", "Joel", "Amós", "Obadias",
    "Jonas", "Miquéias", "Naum", "Habacuque", "Sofonias", "Ageu", "Zacarias", "Malaquias",
    // New Testament
    "Mateus", "Marcos", "Lucas", "João", "Atos", "Romanos", "1 Coríntios", "2 Coríntios",
    "Gálatas", "Efésios", "Filipenses", "Colossenses", "1 Tessalonicenses",
    "2 Tessalonicenses", "1 Timóteo", "2 Timóteo", "Tito", "Filemom", "Hebreus", "Tiago",
    "1 Pedro", "2 Pedro", "1 João", "2 João", "3 João", "Judas", "Apocalipse",
];

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    let mut names: Vec<&str> = BOOKS
        .iter()
        .map(|b| b.trim_start_matches(|c: char| c.is_ascii_digit() || c == ' '))
        .collect();
    // Longest first so the alternation never stops at a shorter prefix.
    names.sort_unstable_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    names.dedup();
    let alternation = names
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?:^|[^\p{{L}}\d])((?:[123]\s)?(?:{alternation}))\s+(\d{{1,3}}):(\d{{1,3}}(?:-\d{{1,3}})?)"
    ))
    .expect("citation pattern is valid")
});

/// Scripture references in order of first appearance, without duplicates.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();
    for caps in CITATION_RE.captures_iter(text) {
        let book = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
        let Ok(chapter) = caps[2].parse::<i32>() else {
            continue;
        };
        let verse = caps[3].to_string();
        let reference = format!("{book} {chapter}:{verse}");

        if citations.iter().any(|c| c.reference == reference) {
            continue;
        }
        citations.push(Citation {
            reference,
            book,
            chapter,
            verse,
        });
    }
    citations
}
