//! ============================================================================
//! Memory Types - Data structures for conversation memory
//! ============================================================================
//! Stored turn pairs, scored search hits, and the retrieved context that
//! gets rendered into the conversation prompt.
//! ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One human/assistant exchange persisted in the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier for this record
    pub id: Uuid,
    /// What the human said
    pub input: String,
    /// What the assistant answered
    pub response: String,
    /// Unix timestamp when the exchange was saved
    pub created_at: i64,
    /// Vector embedding of `document()`
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl MemoryRecord {
    /// Create a new record without an embedding
    pub fn new(input: String, response: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            input,
            response,
            created_at: chrono::Utc::now().timestamp(),
            embedding: Vec::new(),
        }
    }

    /// Attach a pre-computed embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Text that is embedded and handed back as context
    pub fn document(&self) -> String {
        exchange_document(&self.input, &self.response)
    }
}

/// Render a turn pair the way it is stored
pub fn exchange_document(input: &str, response: &str) -> String {
    format!("input: {}\nresponse: {}", input, response)
}

/// A record returned by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: MemoryRecord,
    /// Cosine similarity, higher is closer
    pub score: f32,
}

/// Context retrieved for one input, most similar first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    pub records: Vec<ScoredRecord>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Newline-joined documents, ready for the conversation prompt
    pub fn render(&self) -> String {
        self.records
            .iter()
            .map(|r| r.record.document())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    Human,
    Ai,
}

/// A message in session-history form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
        }
    }
}

/// Render session messages as `Human:` / `AI:` lines
pub fn render_chat_messages(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let label = match m.role {
                ChatRole::Human => "Human",
                ChatRole::Ai => "AI",
            };
            format!("{}: {}", label, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let record = MemoryRecord::new("What is 2+2?".to_string(), "4".to_string());
        assert_eq!(record.document(), "input: What is 2+2?\nresponse: 4");
        assert!(record.embedding.is_empty());
        assert!(record.created_at > 0);
    }

    #[test]
    fn test_context_render() {
        let context = RetrievedContext {
            records: vec![
                ScoredRecord {
                    record: MemoryRecord::new("hi".to_string(), "hello".to_string()),
                    score: 0.9,
                },
                ScoredRecord {
                    record: MemoryRecord::new("bye".to_string(), "see you".to_string()),
                    score: 0.4,
                },
            ],
        };

        assert_eq!(
            context.render(),
            "input: hi\nresponse: hello\ninput: bye\nresponse: see you"
        );
        assert!(RetrievedContext::default().render().is_empty());
    }

    #[test]
    fn test_render_chat_messages() {
        let rendered = render_chat_messages(&[ChatMessage::human("hi"), ChatMessage::ai("hello")]);
        assert_eq!(rendered, "Human: hi\nAI: hello");
    }
}
