//! ============================================================================
//! Prompt Builder - Deterministic prompt text for the model
//! ============================================================================
//! Two templates:
//! - The stateless relay prompt, embedding server, channel and sender
//! - The conversation prompt, embedding retrieved history and the input
//! ============================================================================

use crate::types::IncomingMessage;

/// Message metadata the relay prompt is assembled from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext<'a> {
    pub server: &'a str,
    pub channel: &'a str,
    pub sender: &'a str,
    pub content: &'a str,
}

impl<'a> From<&'a IncomingMessage> for PromptContext<'a> {
    fn from(message: &'a IncomingMessage) -> Self {
        Self {
            server: message.server_name(),
            channel: &message.channel.name,
            sender: &message.author.display_name,
            content: &message.content,
        }
    }
}

/// Build the stateless relay prompt
pub fn build_relay_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        "You are a Discord bot AI assistant, actively participating in a real-time conversation.\n\n\
        Conversation Context:\n\
        - Server: {}\n\
        - Channel: {}\n\
        - Sender: {}\n\n\
        Original Message: {}\n\n\
        Communication Guidelines:\n\
        - Respond naturally and concisely\n\
        - Be direct and engaging\n\
        - Provide relevant and interesting responses\n\
        - Refer to the sender by their display name",
        ctx.server,
        ctx.channel,
        ctx.sender,
        ctx.content.trim()
    )
}

/// Build the conversation-chain prompt from rendered history and the new input
pub fn build_conversation_prompt(history: &str, input: &str) -> String {
    format!(
        "The following is a conversation between a human and an AI assistant.\n\
        Current conversation:\n\
        {}\n\
        Human: {}\n\
        AI Assistant: ",
        history, input
    )
}

/// Remove the bot's mention tags (`<@id>` and `<@!id>`) and trim
pub fn strip_bot_mention(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@{}>", bot_id), "")
        .replace(&format!("<@!{}>", bot_id), "")
        .trim()
        .to_string()
}
