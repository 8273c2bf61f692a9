use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::text::joined_text;

const MAX_ITEMS: usize = 20;

static POST_ITEM: LazyLock<Selector> = LazyLock::new(|| sel("div.post-item"));
static POST_ITEM_FALLBACK: LazyLock<Selector> =
    LazyLock::new(|| sel("[class*='post'][class*='type-post']"));
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| sel("h2.entry-title a"));
static TITLE_LINK_FALLBACK: LazyLock<Selector> = LazyLock::new(|| sel("h2 a"));
static DATE_LABEL: LazyLock<Selector> = LazyLock::new(|| sel("div.date_label"));
static EXCERPT: LazyLock<Selector> = LazyLock::new(|| sel("div.post-excerpt"));
static THUMBNAIL: LazyLock<Selector> = LazyLock::new(|| sel("div.image_wrapper img"));

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static CSS selector")
}

/// One entry of the devotional listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    pub title: String,
    pub href: String,
    pub date: String,
    pub excerpt: String,
    pub thumbnail_url: Option<String>,
}

/// Parse the listing page (WordPress/BeTheme markup).
///
/// - Uses `div.post-item`, falling back to generic `type-post` elements
/// - Caps at 20 items
/// - Skips items without a title or link
/// - Relative thumbnails are prefixed with `origin`
pub fn parse_listing(html: &str, origin: &str) -> Vec<ListingItem> {
    let document = Html::parse_document(html);

    let mut items: Vec<ElementRef> = document.select(&POST_ITEM).collect();
    if items.is_empty() {
        items = document.select(&POST_ITEM_FALLBACK).collect();
    }

    items
        .into_iter()
        .take(MAX_ITEMS)
        .filter_map(|item| parse_item(&item, origin))
        .collect()
}

fn parse_item(item: &ElementRef, origin: &str) -> Option<ListingItem> {
    let link = item
        .select(&TITLE_LINK)
        .next()
        .or_else(|| item.select(&TITLE_LINK_FALLBACK).next())?;

    let title = joined_text(&link, "");
    let href = link.value().attr("href").unwrap_or_default().trim().to_string();
    if title.is_empty() || href.is_empty() {
        return None;
    }

    let date = item
        .select(&DATE_LABEL)
        .next()
        .map(|el| joined_text(&el, ""))
        .unwrap_or_default();

    let excerpt = item
        .select(&EXCERPT)
        .next()
        .map(|el| joined_text(&el, " "))
        .unwrap_or_default();

    let thumbnail_url = item.select(&THUMBNAIL).next().and_then(|img| {
        let attrs = img.value();
        ["src", "data-src", "data-lazy-src"]
            .iter()
            .filter_map(|name| attrs.attr(name))
            .find(|v| !v.is_empty())
            .map(|src| absolutize(src, origin))
    });

    Some(ListingItem {
        title,
        href,
        date,
        excerpt,
        thumbnail_url,
    })
}

fn absolutize(src: &str, origin: &str) -> String {
    if src.starts_with("http") {
        src.to_string()
    } else {
        format!("{}{}", origin.trim_end_matches('/'), src)
    }
}
