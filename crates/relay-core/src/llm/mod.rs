//! ============================================================================
//! LLM Module - Hosted language-model clients
//! ============================================================================
//! A single text-in/text-out completion call. One best-effort attempt per
//! message; callers turn failures into a visible error reply.
//! ============================================================================

mod gemini;

use anyhow::Result;
use async_trait::async_trait;

pub use gemini::{GeminiModel, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

/// Sampling settings sent with every generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Model identifier, e.g. `gemini-1.5-flash`
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_GEMINI_MODEL.to_string(),
            temperature: 0.7,
            max_output_tokens: 256,
        }
    }
}

/// A hosted text-generation API
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Submit a prompt and return the completion text
    async fn generate(&self, prompt: &str) -> Result<String>;
}
