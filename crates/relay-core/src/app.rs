//! ============================================================================
//! App Wiring - Builds the process-scoped services once at startup
//! ============================================================================
//! Model client, embedder, vector store, memory and reply sink are built
//! here and moved into the `RelayHandler`, which the gateway then shares
//! across events.
//! ============================================================================

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::info;

use crate::chain::{ConversationChain, SessionChain};
use crate::config::{MemorySettings, RelayConfig};
use crate::dispatch::{DiscordReplySink, ReplySink};
use crate::handler::{RelayHandler, Responder};
use crate::llm::{GeminiModel, LanguageModel};
use crate::memory::{
    Embedder, GeminiEmbeddings, LocalVectorStore, QdrantVectorStore, SharedSessionHistory,
    VectorStore, VectorStoreMemory, EMBEDDING_DIM,
};
use crate::types::RelayMode;

/// Build the handler for `mode`, posting replies through Discord REST
pub async fn build_handler(config: &RelayConfig, mode: RelayMode) -> Result<RelayHandler> {
    let sink: Arc<dyn ReplySink> = Arc::new(DiscordReplySink::new(config.discord_token.clone()));
    build_handler_with_sink(config, mode, sink).await
}

/// Build the handler for `mode` with an explicit reply sink
pub async fn build_handler_with_sink(
    config: &RelayConfig,
    mode: RelayMode,
    sink: Arc<dyn ReplySink>,
) -> Result<RelayHandler> {
    let model: Arc<dyn LanguageModel> = Arc::new(GeminiModel::with_base_url(
        config.google_api_key.clone(),
        config.gemini_base_url.clone(),
        config.generation.clone(),
    ));
    info!(
        "Gemini model {} (temperature {}, max {} tokens)",
        config.generation.model, config.generation.temperature, config.generation.max_output_tokens
    );

    let responder = match mode {
        RelayMode::Stateless => Responder::Stateless(model),
        RelayMode::VectorMemory => {
            let memory = build_memory(config).await?;
            memory.prepare().await?;
            Responder::Conversation(ConversationChain::new(model, memory))
        }
        RelayMode::SessionMemory => {
            let memory = build_memory(config).await?;
            check_collection(&memory).await?;
            Responder::Session(SessionChain::new(model, SharedSessionHistory::new(memory)))
        }
    };

    info!("Relay mode: {}", mode);
    Ok(RelayHandler::new(
        config.allow_list.clone(),
        responder,
        sink,
        config.response_timeout,
    ))
}

async fn build_memory(config: &RelayConfig) -> Result<Arc<VectorStoreMemory>> {
    let embeddings: Arc<dyn Embedder> = Arc::new(GeminiEmbeddings::new_custom(
        config.google_api_key.clone(),
        config.gemini_base_url.clone(),
        &config.memory.embedding_model,
        EMBEDDING_DIM,
    ));
    let store = open_store(&config.memory)?;

    Ok(Arc::new(VectorStoreMemory::new(
        store,
        embeddings,
        config.memory.top_k,
    )))
}

/// Open the configured vector store backend
pub fn open_store(settings: &MemorySettings) -> Result<Arc<dyn VectorStore>> {
    match &settings.qdrant_url {
        Some(url) => {
            info!("Using Qdrant vector store at {}", url);
            Ok(Arc::new(QdrantVectorStore::new(url, &settings.collection)?))
        }
        None => {
            info!(
                "Using local vector store in {}",
                settings.persist_dir.display()
            );
            Ok(Arc::new(LocalVectorStore::open(
                &settings.persist_dir,
                &settings.collection,
            )?))
        }
    }
}

/// Explicit existence check for the session-memory startup path
async fn check_collection(memory: &VectorStoreMemory) -> Result<()> {
    let store = memory.store();
    let name = store.collection_name().to_string();

    if store.collection_exists().await? {
        let count = store.count().await?;
        info!("Collection {} exists with {} stored exchanges", name, count);
        return Ok(());
    }

    info!("Collection {} not found, creating it", name);
    if !memory.prepare().await? {
        return Err(anyhow!("Collection {} could not be created", name));
    }
    Ok(())
}
