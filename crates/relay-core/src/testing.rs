//! Test doubles for the model, embedder and reply sinks.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::dispatch::ReplySink;
use crate::llm::LanguageModel;
use crate::memory::Embedder;
use crate::types::SentReply;

/// Returns canned replies in order and records every prompt
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(str::to_string).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().await.push(prompt.to_string());
        self.replies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow!("scripted model ran out of replies"))
    }
}

/// Always fails
pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("model unavailable"))
    }
}

/// Sleeps before answering
pub struct SlowModel(pub Duration);

#[async_trait]
impl LanguageModel for SlowModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("too late".to_string())
    }
}

/// Records every reply instead of posting it
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(u64, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<(u64, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, channel_id: u64, content: &str) -> Result<SentReply> {
        if self.fail {
            return Err(anyhow!("Discord API error 500: unavailable"));
        }

        let mut sent = self.sent.lock().await;
        sent.push((channel_id, content.to_string()));
        Ok(SentReply {
            message_id: sent.len().to_string(),
            channel_id,
        })
    }
}

/// Never finishes posting
pub struct HungSink;

#[async_trait]
impl ReplySink for HungSink {
    async fn send(&self, _channel_id: u64, _content: &str) -> Result<SentReply> {
        std::future::pending().await
    }
}

/// Deterministic bag-of-words embedder. Arithmetic words and anything
/// containing `+` share dimension 0; other tokens hash into the rest.
pub struct KeywordEmbedder;

pub const KEYWORD_DIM: usize = 64;

const ARITHMETIC_WORDS: [&str; 5] = ["addition", "add", "sum", "plus", "arithmetic"];

impl KeywordEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; KEYWORD_DIM];
        let lower = text.to_lowercase();
        let tokens = lower
            .split(|c: char| !c.is_alphanumeric() && c != '+')
            .filter(|t| !t.is_empty());

        for token in tokens {
            let bucket = if token.contains('+') || ARITHMETIC_WORDS.contains(&token) {
                0
            } else {
                let hash = token
                    .bytes()
                    .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
                1 + (hash as usize % (KEYWORD_DIM - 1))
            };
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        KEYWORD_DIM
    }
}
