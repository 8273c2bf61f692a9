use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::detail::{parse_detail, DetailContent};
use crate::error::ScrapeError;
use crate::listing::parse_listing;
use crate::post::ScrapedPost;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Where devotional posts come from.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_posts(&self) -> Result<Vec<ScrapedPost>, ScrapeError>;

    fn source_url(&self) -> &str;
}

/// Scrapes the listing page, then every linked detail page in order.
pub struct DevotionalScraper {
    client: reqwest::Client,
    source_url: String,
    origin: String,
}

impl DevotionalScraper {
    pub fn new(source_url: impl Into<String>) -> Result<Self, ScrapeError> {
        let source_url = source_url.into();
        let origin = origin_of(&source_url)?;
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            source_url,
            origin,
        })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ScrapeError> {
        let fetch_err = |reason: String| ScrapeError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }

        response.text().await.map_err(|e| fetch_err(e.to_string()))
    }

    /// A detail page that cannot be fetched contributes nothing; the listing data still counts.
    async fn fetch_detail(&self, url: &str) -> DetailContent {
        match self.fetch_html(url).await {
            Ok(html) => parse_detail(&html),
            Err(e) => {
                warn!(error = %e, "Detail page unavailable");
                DetailContent::default()
            }
        }
    }
}

#[async_trait]
impl PostSource for DevotionalScraper {
    async fn fetch_posts(&self) -> Result<Vec<ScrapedPost>, ScrapeError> {
        let html = self.fetch_html(&self.source_url).await?;
        let items = parse_listing(&html, &self.origin);
        info!(source = %self.source_url, items = items.len(), "Listing parsed");

        let mut posts = Vec::with_capacity(items.len());
        for item in &items {
            let detail = self.fetch_detail(&item.href).await;
            debug!(url = %item.href, has_audio = detail.audio_url.is_some(), "Detail parsed");
            posts.push(ScrapedPost::assemble(item, detail));
        }

        Ok(posts)
    }

    fn source_url(&self) -> &str {
        &self.source_url
    }
}

fn origin_of(source_url: &str) -> Result<String, ScrapeError> {
    let url = Url::parse(source_url).map_err(|_| ScrapeError::InvalidUrl(source_url.to_string()))?;
    match url.host_str() {
        Some(host) => Ok(match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        }),
        None => Err(ScrapeError::InvalidUrl(source_url.to_string())),
    }
}
