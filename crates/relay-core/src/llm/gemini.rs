//! ============================================================================
//! Gemini Model - Text generation via Google's Generative Language API
//! ============================================================================
//! Calls `models/{model}:generateContent` with the configured temperature
//! and output cap and returns the first candidate's text.
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationConfig, LanguageModel};

/// Generative Language API base URL
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default generation model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Gemini text-generation client
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    config: GenerationConfig,
}

impl GeminiModel {
    /// Create a client against the public Gemini endpoint
    pub fn new(api_key: String, config: GenerationConfig) -> Self {
        Self::with_base_url(api_key, DEFAULT_GEMINI_BASE_URL.to_string(), config)
    }

    /// Create with a custom base URL
    pub fn with_base_url(api_key: String, base_url: String, config: GenerationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.config.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Calling Gemini {} with {} chars",
            self.config.model,
            prompt.len()
        );

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: RequestGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to call Gemini API: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read Gemini response body: {}", e))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(anyhow!(
                    "Gemini API error ({}): {}",
                    status,
                    error.error.message
                ));
            }
            return Err(anyhow!("Gemini API error ({}): {}", status, body));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse Gemini response: {}", e))?;

        if let Some(feedback) = parsed.prompt_feedback.as_ref() {
            if let Some(reason) = &feedback.block_reason {
                return Err(anyhow!("Gemini blocked the prompt: {}", reason));
            }
        }

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No candidates in Gemini response"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(anyhow!(
                "Gemini returned no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ));
        }

        debug!("Gemini returned {} chars", text.len());
        Ok(text)
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: RequestGenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn model(base_url: String) -> GeminiModel {
        GeminiModel::with_base_url("test-key".to_string(), base_url, GenerationConfig::default())
    }

    #[test]
    fn test_endpoint() {
        let model = GeminiModel::new("k".to_string(), GenerationConfig::default());
        assert_eq!(
            model.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_sends_config_and_joins_parts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }],
                "generationConfig": { "maxOutputTokens": 256 }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": { "role": "model", "parts": [{ "text": "Hi " }, { "text": "Alice!" }] },
                        "finishReason": "STOP"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let text = model(format!("{}/", server.url())).generate("hello").await.unwrap();
        assert_eq!(text, "Hi Alice!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_message_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#)
            .create_async()
            .await;

        let err = model(server.url()).generate("hello").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let err = model(server.url()).generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_empty_candidate_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#)
            .create_async()
            .await;

        let err = model(server.url()).generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }
}
