//! OpenAI embedding and chat providers over the REST API.
//!
//! This module is only available when the `openai` feature is enabled. Both
//! providers accept a custom base URL, so any OpenAI-compatible server (for
//! example a local Ollama at `http://localhost:11434/v1`) works as well.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::Embedder;
use crate::error::{CragError, Result};
use crate::generator::{GenerationRequest, GenerativeModel};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// The default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

fn api_key_from_env(provider: &str) -> std::result::Result<String, String> {
    std::env::var("OPENAI_API_KEY")
        .map_err(|_| format!("{provider}: OPENAI_API_KEY environment variable not set"))
}

/// Turn a non-success response into a readable message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`Embedder`] backed by the OpenAI embeddings API.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – optional Matryoshka dimension override.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use crag_engine::openai::OpenAIEmbedder;
///
/// let embedder = OpenAIEmbedder::new("sk-...")?;
/// let embedding = embedder.embed("hello world").await?;
/// ```
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbedder {
    /// Create a new embedder with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(CragError::EmbeddingError {
                provider: "OpenAI".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key),
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create an embedder for an OpenAI-compatible server without authentication.
    pub fn compatible(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        }
    }

    /// The API base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The embedding model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Create a new embedder using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = api_key_from_env("OpenAI")
            .map_err(|message| CragError::EmbeddingError { provider: "OpenAI".into(), message })?;
        Self::new(api_key)
    }

    /// Set the API base URL, e.g. for an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| CragError::EmbeddingError {
            provider: "OpenAI".into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "OpenAI",
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let mut http =
            self.client.post(format!("{}/embeddings", self.base_url)).json(&request_body);
        if let Some(api_key) = &self.api_key {
            http = http.bearer_auth(api_key);
        }

        let response = http.send().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "request failed");
            CragError::EmbeddingError {
                provider: "OpenAI".into(),
                message: format!("request failed: {e}"),
            }
        })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "OpenAI", %message, "API error");
            return Err(CragError::EmbeddingError { provider: "OpenAI".into(), message });
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse response");
            CragError::EmbeddingError {
                provider: "OpenAI".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// A [`GenerativeModel`] backed by the chat completions endpoint.
///
/// Requests always use `temperature: 0` for greedy, repeatable decoding.
///
/// # Example
///
/// ```rust,ignore
/// use crag_engine::openai::OpenAIChatModel;
///
/// let model = OpenAIChatModel::from_env()?.with_model("gpt-4o-mini");
/// // Local OpenAI-compatible server, no key required:
/// let local = OpenAIChatModel::compatible("http://localhost:11434/v1", "llama3.2");
/// ```
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAIChatModel {
    /// Create a model client for the OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(CragError::GenerationError {
                model: DEFAULT_CHAT_MODEL.into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key),
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_CHAT_MODEL.into(),
        })
    }

    /// Create a model client using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = api_key_from_env("OpenAI").map_err(|message| CragError::GenerationError {
            model: DEFAULT_CHAT_MODEL.into(),
            message,
        })?;
        Self::new(api_key)
    }

    /// Create a client for an OpenAI-compatible server without authentication.
    pub fn compatible(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The API base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn failure(&self, message: String) -> CragError {
        CragError::GenerationError { model: self.model.clone(), message }
    }
}

#[async_trait]
impl GenerativeModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        debug!(
            model = %self.model,
            mode = %request.mode,
            prompt_len = request.prompt.len(),
            "chat completion"
        );

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: &request.prompt }],
            temperature: 0.0,
            max_tokens: request.max_output_tokens,
        };

        let mut http = self.client.post(format!("{}/chat/completions", self.base_url)).json(&body);
        if let Some(api_key) = &self.api_key {
            http = http.bearer_auth(api_key);
        }

        let response = http.send().await.map_err(|e| {
            error!(model = %self.model, error = %e, "request failed");
            self.failure(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(model = %self.model, %message, "API error");
            return Err(self.failure(message));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            error!(model = %self.model, error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| self.failure("API returned no choices".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatible_clients_need_no_key() {
        let embedder = OpenAIEmbedder::compatible("http://localhost:11434/v1/", "nomic-embed-text");
        assert!(embedder.api_key.is_none());
        assert_eq!(embedder.base_url(), "http://localhost:11434/v1");
        assert_eq!(embedder.model(), "nomic-embed-text");

        let model = OpenAIChatModel::compatible("http://localhost:11434/v1/", "llama3.2");
        assert!(model.api_key.is_none());
        assert_eq!(model.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(OpenAIEmbedder::new(""), Err(CragError::EmbeddingError { .. })));
        assert!(matches!(OpenAIChatModel::new(""), Err(CragError::GenerationError { .. })));
    }

    #[test]
    fn keyed_embedder_can_be_pointed_elsewhere() {
        let embedder = OpenAIEmbedder::new("sk-test").unwrap().with_base_url("http://proxy/v1");
        assert_eq!(embedder.base_url(), "http://proxy/v1");
        assert_eq!(embedder.api_key.as_deref(), Some("sk-test"));
    }
}
