//! ============================================================================
//! Relay Configuration - Environment-sourced settings
//! ============================================================================
//! Loaded once at startup. Required tokens fail fast; everything else
//! has a default. The binary loads `.env` with dotenvy before calling
//! `RelayConfig::from_env`.
//! ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::filter::AllowList;
use crate::llm::{GenerationConfig, DEFAULT_GEMINI_BASE_URL};
use crate::memory::DEFAULT_EMBEDDING_MODEL;

/// Default on-disk vector store directory
pub const DEFAULT_PERSIST_DIR: &str = "./chroma_db";

/// Default vector collection
pub const DEFAULT_COLLECTION: &str = "chat_history";

/// Default number of turns pulled back from memory
pub const DEFAULT_TOP_K: usize = 5;

/// Default per-message timeout for model and memory work
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 60;

/// Configuration errors, all fatal at startup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not set. Please check your .env file.")]
    Missing { var: &'static str },

    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Memory store settings (memory-backed modes only)
#[derive(Debug, Clone)]
pub struct MemorySettings {
    pub persist_dir: PathBuf,
    pub collection: String,
    pub top_k: usize,
    pub embedding_model: String,
    /// Use a remote Qdrant instead of the local store when set
    pub qdrant_url: Option<String>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from(DEFAULT_PERSIST_DIR),
            collection: DEFAULT_COLLECTION.to_string(),
            top_k: DEFAULT_TOP_K,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            qdrant_url: None,
        }
    }
}

/// Full relay configuration
#[derive(Clone)]
pub struct RelayConfig {
    pub discord_token: String,
    pub google_api_key: String,
    pub allow_list: AllowList,
    pub generation: GenerationConfig,
    pub gemini_base_url: String,
    pub memory: MemorySettings,
    pub response_timeout: Duration,
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("discord_token", &"<redacted>")
            .field("google_api_key", &"<redacted>")
            .field("allow_list", &self.allow_list)
            .field("generation", &self.generation)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("memory", &self.memory)
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}

impl RelayConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing {
            var: "DISCORD_TOKEN",
        })?;
        let google_api_key = get("GOOGLE_API_KEY").ok_or(ConfigError::Missing {
            var: "GOOGLE_API_KEY",
        })?;

        let server_id = get("ALLOWED_SERVER_ID")
            .map(|v| parse_var("ALLOWED_SERVER_ID", &v))
            .transpose()?;
        let allow_list = AllowList::new(server_id, get("ALLOWED_CHANNELS").as_deref());

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            temperature: get("GEMINI_TEMPERATURE")
                .map(|v| parse_var("GEMINI_TEMPERATURE", &v))
                .transpose()?
                .unwrap_or(defaults.temperature),
            max_output_tokens: get("GEMINI_MAX_OUTPUT_TOKENS")
                .map(|v| parse_var("GEMINI_MAX_OUTPUT_TOKENS", &v))
                .transpose()?
                .unwrap_or(defaults.max_output_tokens),
        };
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::Invalid {
                var: "GEMINI_TEMPERATURE",
                value: generation.temperature.to_string(),
                reason: "must be between 0.0 and 2.0".to_string(),
            });
        }

        let memory_defaults = MemorySettings::default();
        let top_k: usize = get("MEMORY_TOP_K")
            .map(|v| parse_var("MEMORY_TOP_K", &v))
            .transpose()?
            .unwrap_or(memory_defaults.top_k);
        if top_k == 0 {
            return Err(ConfigError::Invalid {
                var: "MEMORY_TOP_K",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let memory = MemorySettings {
            persist_dir: get("MEMORY_PERSIST_DIR")
                .map(PathBuf::from)
                .unwrap_or(memory_defaults.persist_dir),
            collection: get("MEMORY_COLLECTION").unwrap_or(memory_defaults.collection),
            top_k,
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(memory_defaults.embedding_model),
            qdrant_url: get("QDRANT_URL"),
        };

        let timeout_secs: u64 = get("RESPONSE_TIMEOUT_SECS")
            .map(|v| parse_var("RESPONSE_TIMEOUT_SECS", &v))
            .transpose()?
            .unwrap_or(DEFAULT_RESPONSE_TIMEOUT_SECS);

        Ok(Self {
            discord_token,
            google_api_key,
            allow_list,
            generation,
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            memory,
            response_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
