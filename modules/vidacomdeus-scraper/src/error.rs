use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Invalid source URL {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
