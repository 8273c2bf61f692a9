//! Content ingestion for the "Tempo de Refletir" devotional listing.
//!
//! Parsing is split from fetching: [`listing`] and [`detail`] are pure
//! functions over HTML, [`source::DevotionalScraper`] does the HTTP work.

pub mod detail;
pub mod error;
pub mod listing;
pub mod post;
pub mod reference;
pub mod source;
mod text;

pub use detail::{parse_detail, DetailContent};
pub use error::ScrapeError;
pub use listing::{parse_listing, ListingItem};
pub use post::ScrapedPost;
pub use reference::parse_excerpt_reference;
pub use source::{DevotionalScraper, PostSource};
