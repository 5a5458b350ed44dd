//! ============================================================================
//! Conversation Chains - Memory + template + model, one call per input
//! ============================================================================
//! - ConversationChain: loads context straight from `ConversationMemory`
//! - SessionChain: goes through the session-history contract, keyed by
//!   session id (see `SharedSessionHistory` for the isolation caveat)
//! ============================================================================

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::llm::LanguageModel;
use crate::memory::{render_chat_messages, ConversationMemory, SharedSessionHistory};
use crate::prompt::build_conversation_prompt;

/// Retrieval-augmented conversation chain
pub struct ConversationChain {
    model: Arc<dyn LanguageModel>,
    memory: Arc<dyn ConversationMemory>,
}

impl ConversationChain {
    pub fn new(model: Arc<dyn LanguageModel>, memory: Arc<dyn ConversationMemory>) -> Self {
        Self { model, memory }
    }

    /// Answer `input` with recalled context, then remember the exchange
    pub async fn predict(&self, input: &str) -> Result<String> {
        let context = self.memory.load(input).await?;
        debug!("Recalled {} past exchanges", context.len());

        let prompt = build_conversation_prompt(&context.render(), input);
        let output = self.model.generate(&prompt).await?;

        self.memory.save(input, &output).await?;
        Ok(output)
    }
}

/// Conversation chain invoked through session-keyed history
pub struct SessionChain {
    model: Arc<dyn LanguageModel>,
    sessions: SharedSessionHistory,
}

impl SessionChain {
    pub fn new(model: Arc<dyn LanguageModel>, sessions: SharedSessionHistory) -> Self {
        Self { model, sessions }
    }

    pub async fn invoke(&self, input: &str, session_id: &str) -> Result<String> {
        let history = self.sessions.history(session_id);

        let messages = history.messages(input).await?;
        debug!(
            "Session {}: {} history messages",
            session_id,
            messages.len()
        );

        let prompt = build_conversation_prompt(&render_chat_messages(&messages), input);
        let output = self.model.generate(&prompt).await?;

        history.add_exchange(input, &output).await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{LocalVectorStore, VectorStoreMemory};
    use crate::testing::{FailingModel, KeywordEmbedder, ScriptedModel};
    use tempfile::TempDir;

    async fn memory(dir: &TempDir) -> Arc<VectorStoreMemory> {
        let store = LocalVectorStore::open(dir.path(), "chat_history").unwrap();
        let memory = VectorStoreMemory::new(Arc::new(store), Arc::new(KeywordEmbedder), 5);
        memory.prepare().await.unwrap();
        Arc::new(memory)
    }

    #[tokio::test]
    async fn test_predict_uses_and_updates_memory() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir).await;
        let model = Arc::new(ScriptedModel::new(["4", "It is four"]));
        let chain = ConversationChain::new(model.clone(), memory.clone());

        assert_eq!(chain.predict("What is 2+2?").await.unwrap(), "4");
        assert_eq!(chain.predict("remind me of the addition").await.unwrap(), "It is four");

        let prompts = model.prompts().await;
        assert!(prompts[0].contains("Current conversation:\n\nHuman: What is 2+2?"));
        assert!(prompts[1].contains("input: What is 2+2?\nresponse: 4"));
        assert!(prompts[1].ends_with("Human: remind me of the addition\nAI Assistant: "));
        assert_eq!(memory.store().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_predict_failure_saves_nothing() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir).await;
        let chain = ConversationChain::new(Arc::new(FailingModel), memory.clone());

        assert!(chain.predict("What is 2+2?").await.is_err());
        assert_eq!(memory.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_session_invoke_renders_history_lines() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir).await;
        let model = Arc::new(ScriptedModel::new(["4", "Still 4"]));
        let chain = SessionChain::new(model.clone(), SharedSessionHistory::new(memory.clone()));

        chain.invoke("What is 2+2?", "111").await.unwrap();
        // A different session still sees the first exchange
        assert_eq!(chain.invoke("addition again?", "222").await.unwrap(), "Still 4");

        let prompts = model.prompts().await;
        assert!(prompts[1].contains("Human: What is 2+2?\nAI: 4"));
        assert_eq!(memory.store().count().await.unwrap(), 2);
    }
}
