use scraper::ElementRef;

/// Text of an element with each text node trimmed, empties dropped, joined by `sep`.
pub(crate) fn joined_text(element: &ElementRef, sep: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub(crate) fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
