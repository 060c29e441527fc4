//! Web fallback: answer from open-web snippets when documents cannot.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::generator::AnswerGenerator;

/// Literal answer returned when the web yields nothing usable.
pub const NO_INFORMATION: &str = "No relevant information found on the web.";

/// A best-effort snippet search backend.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Search the web and return the snippets joined into one string.
    ///
    /// An empty string means nothing was found.
    async fn search(&self, query: &str) -> Result<String>;
}

/// Outcome of one web fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebAnswer {
    /// The answer text, or [`NO_INFORMATION`].
    pub answer: String,
    /// Whether any snippet text was found and sent to the generator.
    pub snippets_found: bool,
}

/// Fetches web snippets and delegates to web-mode generation.
pub struct WebFallback {
    search: Arc<dyn WebSearchProvider>,
}

impl WebFallback {
    /// Create a fallback over a search provider.
    pub fn new(search: Arc<dyn WebSearchProvider>) -> Self {
        Self { search }
    }

    /// Answer `question` from the web.
    ///
    /// A failing or empty search degrades to [`NO_INFORMATION`] without
    /// calling the generator. Generator failures are returned.
    pub async fn answer(&self, question: &str, generator: &AnswerGenerator) -> Result<WebAnswer> {
        let snippets = match self.search.search(question).await {
            Ok(snippets) => snippets,
            Err(e) => {
                warn!(provider = self.search.name(), error = %e, "web search failed; degrading");
                String::new()
            }
        };

        if snippets.trim().is_empty() {
            info!(provider = self.search.name(), "web search returned no snippets");
            return Ok(WebAnswer { answer: NO_INFORMATION.to_string(), snippets_found: false });
        }

        let answer = generator.generate_web(question, &snippets).await?;
        Ok(WebAnswer { answer, snippets_found: true })
    }
}
