//! ============================================================================
//! Retriever Memory - Vector-store-backed conversation memory
//! ============================================================================
//! `load` pulls the k most similar past exchanges for the new input;
//! `save` embeds the latest exchange and appends it to the store.
//! Recall is by similarity, not chronology, so this is fuzzy memory
//! rather than a transcript.
//! ============================================================================

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::embeddings::Embedder;
use super::store::VectorStore;
use super::types::{exchange_document, MemoryRecord, RetrievedContext};

/// Turn store with similarity retrieval
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Context relevant to `input`, most similar first
    async fn load(&self, input: &str) -> Result<RetrievedContext>;

    /// Persist one human/assistant exchange
    async fn save(&self, input: &str, output: &str) -> Result<()>;
}

/// Conversation memory combining a vector store and an embedder
pub struct VectorStoreMemory {
    store: Arc<dyn VectorStore>,
    embeddings: Arc<dyn Embedder>,
    top_k: usize,
}

impl VectorStoreMemory {
    pub fn new(store: Arc<dyn VectorStore>, embeddings: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            store,
            embeddings,
            top_k,
        }
    }

    /// Make sure the backing collection exists, sized for the embedder.
    /// Returns true when it had to be created.
    pub async fn prepare(&self) -> Result<bool> {
        self.store.ensure_collection(self.embeddings.dimension()).await
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }
}

#[async_trait]
impl ConversationMemory for VectorStoreMemory {
    async fn load(&self, input: &str) -> Result<RetrievedContext> {
        if input.trim().is_empty() {
            return Ok(RetrievedContext::default());
        }

        debug!("Loading memory context for: {}", input);

        let query = self.embeddings.embed_single(input).await?;
        let records = self.store.search(&query, self.top_k).await?;

        Ok(RetrievedContext { records })
    }

    async fn save(&self, input: &str, output: &str) -> Result<()> {
        let embedding = self
            .embeddings
            .embed_single(&exchange_document(input, output))
            .await?;

        let record =
            MemoryRecord::new(input.to_string(), output.to_string()).with_embedding(embedding);
        self.store.add(&record).await?;

        info!(
            "Saved exchange {} to {}",
            record.id,
            self.store.collection_name()
        );
        Ok(())
    }
}
