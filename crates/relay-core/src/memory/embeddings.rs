//! ============================================================================
//! Embedding Service - Vector embeddings for semantic memory search
//! ============================================================================
//! Generates text embeddings with Gemini's `batchEmbedContents` endpoint.
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::DEFAULT_GEMINI_BASE_URL;

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "embedding-001";

/// Output dimension of embedding-001
pub const EMBEDDING_DIM: usize = 768;

/// Anything that turns text into vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for multiple texts, in input order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Vector dimension produced by this embedder
    fn dimension(&self) -> usize;

    /// Generate embedding for a single text
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding returned"))
    }
}

/// Gemini embedding service
pub struct GeminiEmbeddings {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<EmbedPart>,
}

#[derive(Debug, Serialize)]
struct EmbedPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GeminiEmbeddings {
    /// Create an embedding service against the public Gemini endpoint
    pub fn new(api_key: String, model: &str) -> Self {
        Self::new_custom(api_key, DEFAULT_GEMINI_BASE_URL.to_string(), model, EMBEDDING_DIM)
    }

    /// Create with custom base URL and dimension
    pub fn new_custom(api_key: String, base_url: String, model: &str, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.trim_start_matches("models/").to_string(),
            dimension,
        }
    }

    /// Get the current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Embedder for GeminiEmbeddings {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let expected = texts.len();
        let model_path = format!("models/{}", self.model);
        let request = BatchEmbedRequest {
            requests: texts
                .into_iter()
                .map(|text| EmbedRequest {
                    model: model_path.clone(),
                    content: EmbedContent {
                        parts: vec![EmbedPart { text }],
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:batchEmbedContents",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send embedding request: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body: {}", e))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(anyhow!(
                    "Embedding API error ({}): {}",
                    status,
                    error.error.message
                ));
            }
            return Err(anyhow!("Embedding API error ({}): {}", status, body));
        }

        let parsed: BatchEmbedResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse embedding response: {} - body: {}", e, body))?;

        if parsed.embeddings.len() != expected {
            return Err(anyhow!(
                "Embedding API returned {} vectors for {} texts",
                parsed.embeddings.len(),
                expected
            ));
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
