//! ============================================================================
//! Reply Dispatcher - Posts replies back into the originating channel
//! ============================================================================
//! Uses Discord REST v10 with Bot token authentication. One outbound call
//! per handled message; replies longer than Discord's limit are cut so the
//! channel still receives exactly one message.
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{RelayMode, SentReply};

/// Discord API v10 base URL
const DISCORD_API: &str = "https://discord.com/api/v10";

/// Maximum characters in a single Discord message
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Prefix of the in-channel error reply
pub const ERROR_REPLY_PREFIX: &str = "Oops! System error:";

/// Somewhere replies can be posted
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, channel_id: u64, content: &str) -> Result<SentReply>;
}

/// Reply sink posting through the Discord REST API
pub struct DiscordReplySink {
    client: reqwest::Client,
    bot_token: String,
    api_base: String,
}

impl DiscordReplySink {
    /// Create a new sink with bot token
    pub fn new(bot_token: String) -> Self {
        Self::with_api_base(bot_token, DISCORD_API.to_string())
    }

    /// Create against a custom API base
    pub fn with_api_base(bot_token: String, api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReplySink for DiscordReplySink {
    async fn send(&self, channel_id: u64, content: &str) -> Result<SentReply> {
        debug!(
            "Posting to Discord channel {}: {}...",
            channel_id,
            content.chars().take(50).collect::<String>()
        );

        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let request = MessageRequest {
            content: content.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to post to Discord: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Discord API error {}: {}", status, body));
        }

        let msg_response: MessageResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Discord response: {}", e))?;

        info!("Posted reply {} to channel {}", msg_response.id, channel_id);

        Ok(SentReply {
            message_id: msg_response.id,
            channel_id,
        })
    }
}

/// Shape the model's text into the message that gets posted.
/// The stateless relay tags the sender; memory modes post the text alone.
pub fn format_reply(mode: RelayMode, author_id: u64, text: &str) -> String {
    let reply = match mode {
        RelayMode::Stateless => format!("<@{}> {}", author_id, text),
        RelayMode::VectorMemory | RelayMode::SessionMemory => text.to_string(),
    };
    truncate_for_discord(&reply)
}

/// In-channel reply for a failed model or memory call
pub fn format_error_reply(error: &str) -> String {
    truncate_for_discord(&format!("{} {}", ERROR_REPLY_PREFIX, error))
}

/// Cut to Discord's message limit on a char boundary
pub fn truncate_for_discord(content: &str) -> String {
    if content.chars().count() <= DISCORD_MESSAGE_LIMIT {
        return content.to_string();
    }

    let mut cut: String = content.chars().take(DISCORD_MESSAGE_LIMIT - 1).collect();
    cut.push('…');
    cut
}

// ============================================================================
// Discord API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessageRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_stateless_reply_mentions_author() {
        assert_eq!(format_reply(RelayMode::Stateless, 42, "Hi Alice!"), "<@42> Hi Alice!");
    }

    #[test]
    fn test_memory_reply_is_plain() {
        assert_eq!(format_reply(RelayMode::VectorMemory, 42, "4"), "4");
        assert_eq!(format_reply(RelayMode::SessionMemory, 42, "4"), "4");
    }

    #[test]
    fn test_error_reply() {
        assert_eq!(
            format_error_reply("timed out"),
            "Oops! System error: timed out"
        );
    }

    #[test]
    fn test_truncation_respects_limit_and_chars() {
        let long = "é".repeat(DISCORD_MESSAGE_LIMIT + 10);
        let cut = truncate_for_discord(&long);
        assert_eq!(cut.chars().count(), DISCORD_MESSAGE_LIMIT);
        assert!(cut.ends_with('…'));

        let exact = "a".repeat(DISCORD_MESSAGE_LIMIT);
        assert_eq!(truncate_for_discord(&exact), exact);
    }

    #[tokio::test]
    async fn test_send_posts_to_channel() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/channels/555/messages")
            .match_header("authorization", "Bot token-123")
            .match_body(Matcher::Json(json!({ "content": "<@42> hi" })))
            .with_status(200)
            .with_body(r#"{"id":"9001","channel_id":"555","content":"<@42> hi"}"#)
            .create_async()
            .await;

        let sink = DiscordReplySink::with_api_base("token-123".to_string(), server.url());
        let sent = sink.send(555, "<@42> hi").await.unwrap();

        assert_eq!(sent.message_id, "9001");
        assert_eq!(sent.channel_id, 555);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_surfaces_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/channels/555/messages")
            .with_status(403)
            .with_body(r#"{"message":"Missing Permissions","code":50013}"#)
            .create_async()
            .await;

        let sink = DiscordReplySink::with_api_base("token-123".to_string(), server.url());
        let err = sink.send(555, "hi").await.unwrap_err();
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("Missing Permissions"));
    }
}
