//! ============================================================================
//! RELAY-CORE: Discord ↔ Gemini relay logic
//! ============================================================================
//! This crate handles everything between a gateway event and the reply:
//! - Message filtering (self, server/channel allow-list, mention gate)
//! - Prompt building from message metadata
//! - Gemini text generation and embeddings over reqwest
//! - Retrieval-augmented conversation memory (redb or Qdrant)
//! - Reply posting via Discord REST
//! ============================================================================

pub mod app;
pub mod chain;
pub mod config;
pub mod dispatch;
pub mod filter;
pub mod handler;
pub mod llm;
pub mod memory;
pub mod prompt;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use app::{build_handler, build_handler_with_sink};
pub use config::{ConfigError, RelayConfig};
pub use dispatch::{DiscordReplySink, ReplySink};
pub use filter::{AllowList, FilterDecision, MessageFilter};
pub use handler::{RelayHandler, Responder};
pub use llm::{GeminiModel, GenerationConfig, LanguageModel};
pub use types::*;
