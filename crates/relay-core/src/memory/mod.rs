//! ============================================================================
//! Memory Module - Retrieval-augmented conversation memory
//! ============================================================================
//! Persists every human/assistant exchange in an embedding-indexed vector
//! store and recalls the most similar ones for each new input.
//!
//! ## Architecture
//! ```text
//! Input → Embed → Vector Search (top-k) → RetrievedContext
//!                                              ↓
//!                          [Conversation template] + [Input]
//!                                              ↓
//!                                         Gemini API
//!                                              ↓
//!                            Embed & Store the new exchange
//! ```
//!
//! ## Backends
//! - `LocalVectorStore`: redb file in the persist directory (default)
//! - `QdrantVectorStore`: remote Qdrant, when `QDRANT_URL` is set
//!
//! ## Usage
//! ```rust,ignore
//! use relay_core::memory::{GeminiEmbeddings, LocalVectorStore, VectorStoreMemory};
//!
//! let store = LocalVectorStore::open(Path::new("./chroma_db"), "chat_history")?;
//! let embeddings = GeminiEmbeddings::new(api_key, "embedding-001");
//! let memory = VectorStoreMemory::new(Arc::new(store), Arc::new(embeddings), 5);
//! memory.prepare().await?;
//!
//! memory.save("What is 2+2?", "4").await?;
//! let context = memory.load("addition").await?;
//! ```
//! ============================================================================

mod embeddings;
mod qdrant;
mod retriever;
mod session;
mod store;
mod types;

// Re-export public types
pub use embeddings::{Embedder, GeminiEmbeddings, DEFAULT_EMBEDDING_MODEL, EMBEDDING_DIM};
pub use qdrant::QdrantVectorStore;
pub use retriever::{ConversationMemory, VectorStoreMemory};
pub use session::{ChatHistory, MemoryHistory, SharedSessionHistory};
pub use store::{cosine_similarity, LocalVectorStore, VectorStore, LOCAL_STORE_FILE};
pub use types::{
    exchange_document, render_chat_messages, ChatMessage, ChatRole, MemoryRecord,
    RetrievedContext, ScoredRecord,
};
