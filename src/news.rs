//! Headline collector: paginated news-search results for a fixed query.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// A headline stamped with the calendar day it was published.
#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub date: NaiveDate,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(rename = "totalResults", default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
}

/// Why a page could not be retrieved.
#[derive(Debug, Clone, PartialEq)]
pub enum PageError {
    /// Request never completed or the body could not be decoded
    Transport(String),
    /// Upstream answered with a non-success status
    Status(String),
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageError::Transport(msg) => write!(f, "transport error: {}", msg),
            PageError::Status(msg) => write!(f, "upstream status: {}", msg),
        }
    }
}

/// A source of numbered article pages (1-based).
#[allow(async_fn_in_trait)]
pub trait ArticleSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> std::result::Result<Vec<Article>, PageError>;
}

/// Client for the NewsAPI `everything` endpoint.
pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    query: String,
    from: NaiveDate,
    to: NaiveDate,
}

impl NewsApiClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: String,
        query: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            query: query.to_string(),
            from,
            to,
        }
    }
}

impl ArticleSource for NewsApiClient {
    async fn fetch_page(&self, page: u32, page_size: u32) -> std::result::Result<Vec<Article>, PageError> {
        let url = format!("{}/v2/everything", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", self.query.clone()),
                ("from", self.from.to_string()),
                ("to", self.to.to_string()),
                ("language", "en".to_string()),
                ("sortBy", "publishedAt".to_string()),
                ("pageSize", page_size.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PageError::Transport(e.to_string()))?;

        let http_status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| PageError::Transport(format!("HTTP {}: {}", http_status, e)))?;

        if !http_status.is_success() || body.status != "ok" {
            return Err(PageError::Status(format!(
                "HTTP {} {} {}",
                http_status,
                body.code.unwrap_or_default(),
                body.message.unwrap_or_default()
            )));
        }

        if page == 1 {
            if let Some(total) = body.total_results {
                info!("News search reports {} matching articles", total);
            }
        }

        Ok(body.articles)
    }
}

/// Convert an article into a headline; `None` if title or timestamp is unusable.
pub fn headline_from_article(article: &Article) -> Option<Headline> {
    let text = article.title.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }
    let published = article.published_at.as_deref()?;
    // headlines are bucketed by UTC day, whatever offset the provider sends
    let date = DateTime::parse_from_rfc3339(published).ok()?.naive_utc().date();
    Some(Headline {
        date,
        text: text.to_string(),
    })
}

/// Page through `source` until a short page or an upstream failure.
///
/// Only a failure or an empty result on the first page is an error.
/// Headlines repeated across pages are kept as returned.
pub async fn collect_headlines<S: ArticleSource>(source: &S, page_size: u32) -> Result<Vec<Headline>> {
    let mut headlines = Vec::new();
    let mut page = 1u32;

    loop {
        let articles = match source.fetch_page(page, page_size).await {
            Ok(articles) => articles,
            Err(e) if page == 1 => {
                return Err(PipelineError::DataUnavailable(format!(
                    "first news page failed: {}",
                    e
                )));
            }
            Err(e) => {
                warn!("Stopping news pagination at page {}: {}", page, e);
                break;
            }
        };

        if page == 1 && articles.is_empty() {
            return Err(PipelineError::DataUnavailable(
                "first news page returned no articles".into(),
            ));
        }

        let n_articles = articles.len();
        for article in &articles {
            match headline_from_article(article) {
                Some(h) => headlines.push(h),
                None => debug!("Skipping article without usable title/timestamp"),
            }
        }
        debug!("News page {}: {} articles", page, n_articles);

        if n_articles < page_size as usize {
            break;
        }
        page += 1;
    }

    info!("Collected {} headlines over {} page(s)", headlines.len(), page);
    Ok(headlines)
}
