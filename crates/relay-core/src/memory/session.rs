//! ============================================================================
//! Session History - Session-keyed view over conversation memory
//! ============================================================================
//! `ChatHistory` is the message-list contract the session chain invokes.
//! `MemoryHistory` satisfies it by delegating to a `ConversationMemory`.
//!
//! `SharedSessionHistory` hands out history per session id, but every id
//! resolves to the same memory: there is no per-user isolation. The
//! session id is accepted and logged only.
//! ============================================================================

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::retriever::ConversationMemory;
use super::types::ChatMessage;

/// Session-history contract: messages relevant to an input, plus append
#[async_trait]
pub trait ChatHistory: Send + Sync {
    /// History messages to show the model for this input
    async fn messages(&self, input: &str) -> Result<Vec<ChatMessage>>;

    /// Record one human/assistant exchange
    async fn add_exchange(&self, human: &str, ai: &str) -> Result<()>;
}

/// Adapter from `ConversationMemory` to `ChatHistory`
pub struct MemoryHistory {
    memory: Arc<dyn ConversationMemory>,
}

impl MemoryHistory {
    pub fn new(memory: Arc<dyn ConversationMemory>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl ChatHistory for MemoryHistory {
    async fn messages(&self, input: &str) -> Result<Vec<ChatMessage>> {
        let context = self.memory.load(input).await?;

        Ok(context
            .records
            .into_iter()
            .flat_map(|r| [ChatMessage::human(r.record.input), ChatMessage::ai(r.record.response)])
            .collect())
    }

    async fn add_exchange(&self, human: &str, ai: &str) -> Result<()> {
        self.memory.save(human, ai).await
    }
}

/// Maps every session id to one shared history
pub struct SharedSessionHistory {
    history: Arc<dyn ChatHistory>,
}

impl SharedSessionHistory {
    pub fn new(memory: Arc<dyn ConversationMemory>) -> Self {
        Self {
            history: Arc::new(MemoryHistory::new(memory)),
        }
    }

    /// History for a session. Always the same instance, whatever the id.
    pub fn history(&self, session_id: &str) -> Arc<dyn ChatHistory> {
        debug!("Resolving history for session {} (shared)", session_id);
        Arc::clone(&self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{ChatRole, MemoryRecord, RetrievedContext, ScoredRecord};
    use tokio::sync::Mutex;

    /// Keeps saved exchanges in order and returns all of them on load
    #[derive(Default)]
    struct InMemory {
        saved: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ConversationMemory for InMemory {
        async fn load(&self, _input: &str) -> Result<RetrievedContext> {
            let saved = self.saved.lock().await;
            Ok(RetrievedContext {
                records: saved
                    .iter()
                    .map(|(i, o)| ScoredRecord {
                        record: MemoryRecord::new(i.clone(), o.clone()),
                        score: 1.0,
                    })
                    .collect(),
            })
        }

        async fn save(&self, input: &str, output: &str) -> Result<()> {
            self.saved
                .lock()
                .await
                .push((input.to_string(), output.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_history_delegates_to_memory() {
        let memory = Arc::new(InMemory::default());
        let history = MemoryHistory::new(memory.clone());

        history.add_exchange("hi", "hello").await.unwrap();
        assert_eq!(memory.saved.lock().await.len(), 1);

        let messages = history.messages("hi").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::Human);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].role, ChatRole::Ai);
        assert_eq!(messages[1].content, "hello");
    }

    #[tokio::test]
    async fn test_every_session_shares_one_history() {
        let sessions = SharedSessionHistory::new(Arc::new(InMemory::default()));

        let alice = sessions.history("111");
        let bob = sessions.history("222");
        assert!(Arc::ptr_eq(&alice, &bob));

        alice.add_exchange("my secret is 42", "noted").await.unwrap();
        let seen_by_bob = bob.messages("secret").await.unwrap();
        assert!(seen_by_bob.iter().any(|m| m.content == "my secret is 42"));
    }
}
