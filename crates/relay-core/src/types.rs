//! ============================================================================
//! Core Types - Shared data structures for the relay
//! ============================================================================
//! Messages as seen by the relay, the bot's own identity, and the
//! outcome of handling a single message event.
//! ============================================================================

use serde::{Deserialize, Serialize};

/// Server label used in prompts for messages without a guild
pub const DIRECT_MESSAGE_LABEL: &str = "Direct Message";

/// Author of an incoming message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Discord user id (snowflake)
    pub id: u64,
    /// Account user name
    pub name: String,
    /// Nickname, global display name, or user name, in that order
    pub display_name: String,
}

/// Guild (server) a message was posted in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildInfo {
    pub id: u64,
    pub name: String,
}

/// Channel a message was posted in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: u64,
    /// Channel name, empty when it could not be resolved (e.g. DMs)
    pub name: String,
}

/// A message event delivered by the gateway, read-only to the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub author: Author,
    /// None for direct messages
    pub guild: Option<GuildInfo>,
    pub channel: ChannelInfo,
    /// Raw message text
    pub content: String,
    /// User ids mentioned in the message
    #[serde(default)]
    pub mentions: Vec<u64>,
}

impl IncomingMessage {
    /// Name of the originating server, or the DM label
    pub fn server_name(&self) -> &str {
        self.guild
            .as_ref()
            .map(|g| g.name.as_str())
            .unwrap_or(DIRECT_MESSAGE_LABEL)
    }

    /// Whether the given user is mentioned in this message
    pub fn mentions_user(&self, user_id: u64) -> bool {
        self.mentions.contains(&user_id)
    }
}

/// The bot's own identity, learned when the gateway session is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: u64,
}

impl BotIdentity {
    pub fn new(user_id: u64) -> Self {
        Self { user_id }
    }
}

/// Which of the three relay pipelines is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelayMode {
    /// Prompt template straight to the model, no memory
    Stateless,
    /// Retrieval-augmented conversation chain over the vector store
    VectorMemory,
    /// Like `VectorMemory`, invoked through the session-history adapter
    SessionMemory,
}

impl RelayMode {
    /// Memory-backed modes only answer when the bot is mentioned
    pub fn requires_mention(&self) -> bool {
        !matches!(self, RelayMode::Stateless)
    }
}

impl std::fmt::Display for RelayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RelayMode::Stateless => "stateless",
            RelayMode::VectorMemory => "vector-memory",
            RelayMode::SessionMemory => "session-memory",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for RelayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stateless" => Ok(RelayMode::Stateless),
            "vector-memory" | "vector_memory" | "memory" => Ok(RelayMode::VectorMemory),
            "session-memory" | "session_memory" | "session" => Ok(RelayMode::SessionMemory),
            _ => Err(format!("Unknown relay mode: {}", s)),
        }
    }
}

/// Why the filter turned a message away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    SelfAuthored,
    ServerNotAllowed,
    ChannelNotAllowed,
    NotMentioned,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            RejectReason::SelfAuthored => "message authored by the bot",
            RejectReason::ServerNotAllowed => "server not in allow-list",
            RejectReason::ChannelNotAllowed => "channel not in allow-list",
            RejectReason::NotMentioned => "bot not mentioned",
        };
        f.write_str(reason)
    }
}

/// Result of posting a reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentReply {
    pub message_id: String,
    pub channel_id: u64,
}

/// What happened to one message event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Filtered out, nothing was sent
    Ignored(RejectReason),
    /// Model reply posted
    Replied { content: String },
    /// Model or memory failed; an error reply was posted instead
    Failed { content: String, error: String },
}
