//! ============================================================================
//! Message Filter - Decides which messages reach the model
//! ============================================================================
//! Pure decision logic, no side effects:
//! - Messages authored by the bot itself are always ignored
//! - An allow-listed server id restricts which guild is served
//! - A non-empty allow-listed channel set restricts which channels are served
//! - Memory-backed modes additionally require the bot to be mentioned
//! ============================================================================

use serde::{Deserialize, Serialize};

use crate::types::{BotIdentity, IncomingMessage, RejectReason};

/// Servers and channels the bot is permitted to respond in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowList {
    /// Permitted guild, if restricted
    pub server_id: Option<u64>,
    /// Permitted channel names; empty means every channel
    pub channels: Vec<String>,
}

impl AllowList {
    /// Build from an optional server id and a comma-separated channel list.
    /// Blank entries are dropped and names are trimmed.
    pub fn new(server_id: Option<u64>, channels: Option<&str>) -> Self {
        let channels = channels
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self { server_id, channels }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.server_id.is_none() && self.channels.is_empty()
    }

    fn permits_server(&self, message: &IncomingMessage) -> bool {
        match self.server_id {
            None => true,
            Some(allowed) => message.guild.as_ref().map(|g| g.id) == Some(allowed),
        }
    }

    fn permits_channel(&self, message: &IncomingMessage) -> bool {
        self.channels.is_empty() || self.channels.iter().any(|c| *c == message.channel.name)
    }
}

/// Filter verdict for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject(RejectReason),
}

impl FilterDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, FilterDecision::Accept)
    }
}

/// Message filter combining the allow-list with mention gating
#[derive(Debug, Clone)]
pub struct MessageFilter {
    allow_list: AllowList,
    require_mention: bool,
}

impl MessageFilter {
    pub fn new(allow_list: AllowList, require_mention: bool) -> Self {
        Self {
            allow_list,
            require_mention,
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Decide whether a message should be forwarded to the model
    pub fn check(&self, message: &IncomingMessage, bot: &BotIdentity) -> FilterDecision {
        if message.author.id == bot.user_id {
            return FilterDecision::Reject(RejectReason::SelfAuthored);
        }

        if !self.allow_list.permits_server(message) {
            return FilterDecision::Reject(RejectReason::ServerNotAllowed);
        }

        if !self.allow_list.permits_channel(message) {
            return FilterDecision::Reject(RejectReason::ChannelNotAllowed);
        }

        if self.require_mention && !message.mentions_user(bot.user_id) {
            return FilterDecision::Reject(RejectReason::NotMentioned);
        }

        FilterDecision::Accept
    }
}
