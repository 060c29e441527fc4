//! DuckDuckGo HTML snippet search.
//!
//! This module is only available when the `web` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, error};

use crate::error::{CragError, Result};
use crate::web::WebSearchProvider;

/// The DuckDuckGo HTML endpoint.
const DUCKDUCKGO_HTML_URL: &str = "https://duckduckgo.com/html/";

/// The CSS selector of a result snippet on the HTML endpoint.
const SNIPPET_SELECTOR: &str = ".result__snippet";

/// A [`WebSearchProvider`] scraping DuckDuckGo's HTML results page.
///
/// # Configuration
///
/// - `max_results` – number of snippets kept, defaults to 5.
/// - `timeout` – request timeout, defaults to 10 seconds.
///
/// # Example
///
/// ```rust,ignore
/// use crag_engine::duckduckgo::DuckDuckGoSearch;
///
/// let search = DuckDuckGoSearch::new()?.with_max_results(3);
/// let snippets = search.search("Chichen Itza").await?;
/// ```
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    max_results: usize,
}

impl DuckDuckGoSearch {
    /// Create a search client with the default timeout and result count.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// Create a search client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| CragError::WebSearchError {
                provider: "DuckDuckGo".into(),
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client, max_results: 5 })
    }

    /// Set how many snippets are kept.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// Extract the first `max_results` snippet texts from a results page.
pub(crate) fn extract_snippets(html: &str, max_results: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(SNIPPET_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|node| node.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .take(max_results)
        .collect()
}

#[async_trait]
impl WebSearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "DuckDuckGo"
    }

    async fn search(&self, query: &str) -> Result<String> {
        debug!(provider = "DuckDuckGo", query, "web search");

        let response = self
            .client
            .post(DUCKDUCKGO_HTML_URL)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| {
                error!(provider = "DuckDuckGo", error = %e, "request failed");
                CragError::WebSearchError {
                    provider: "DuckDuckGo".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(provider = "DuckDuckGo", %status, "search error");
            return Err(CragError::WebSearchError {
                provider: "DuckDuckGo".into(),
                message: format!("search returned {status}"),
            });
        }

        let html = response.text().await.map_err(|e| CragError::WebSearchError {
            provider: "DuckDuckGo".into(),
            message: format!("failed to read response body: {e}"),
        })?;

        let snippets = extract_snippets(&html, self.max_results);
        debug!(provider = "DuckDuckGo", snippet_count = snippets.len(), "parsed snippets");
        Ok(snippets.join("\n"))
    }
}
