//! ============================================================================
//! Relay Handler - One message event in, at most one reply out
//! ============================================================================
//! filter → input → responder (bounded by a timeout) → format → post.
//! Model and memory failures become the in-channel error reply; only a
//! failure to post is returned to the caller. Posting is bounded by the
//! same per-message timeout as the model call.
//! ============================================================================

use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::chain::{ConversationChain, SessionChain};
use crate::dispatch::{format_error_reply, format_reply, ReplySink};
use crate::filter::{AllowList, FilterDecision, MessageFilter};
use crate::llm::LanguageModel;
use crate::prompt::{build_relay_prompt, strip_bot_mention, PromptContext};
use crate::types::{BotIdentity, HandleOutcome, IncomingMessage, RelayMode};

/// What produces the reply text for an accepted message
pub enum Responder {
    /// Relay prompt straight to the model
    Stateless(Arc<dyn LanguageModel>),
    /// Retrieval-augmented chain over conversation memory
    Conversation(ConversationChain),
    /// Same chain, invoked through session history keyed by author id
    Session(SessionChain),
}

impl Responder {
    pub fn mode(&self) -> RelayMode {
        match self {
            Responder::Stateless(_) => RelayMode::Stateless,
            Responder::Conversation(_) => RelayMode::VectorMemory,
            Responder::Session(_) => RelayMode::SessionMemory,
        }
    }
}

/// Per-message handler shared by every gateway event
pub struct RelayHandler {
    filter: MessageFilter,
    responder: Responder,
    sink: Arc<dyn ReplySink>,
    timeout: Duration,
}

impl RelayHandler {
    pub fn new(
        allow_list: AllowList,
        responder: Responder,
        sink: Arc<dyn ReplySink>,
        timeout: Duration,
    ) -> Self {
        let filter = MessageFilter::new(allow_list, responder.mode().requires_mention());
        Self {
            filter,
            responder,
            sink,
            timeout,
        }
    }

    pub fn mode(&self) -> RelayMode {
        self.responder.mode()
    }

    pub fn filter(&self) -> &MessageFilter {
        &self.filter
    }

    /// Handle one incoming message
    pub async fn handle(
        &self,
        message: &IncomingMessage,
        bot: &BotIdentity,
    ) -> Result<HandleOutcome> {
        if let FilterDecision::Reject(reason) = self.filter.check(message, bot) {
            debug!(
                "Ignoring message from {} in #{}: {}",
                message.author.display_name, message.channel.name, reason
            );
            return Ok(HandleOutcome::Ignored(reason));
        }

        let result = match tokio::time::timeout(self.timeout, self.respond(message, bot)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "no response within {} seconds",
                self.timeout.as_secs_f32()
            )),
        };

        let (content, outcome) = match result {
            Ok(text) => {
                let content = format_reply(self.mode(), message.author.id, &text);
                (content.clone(), HandleOutcome::Replied { content })
            }
            Err(e) => {
                error!("Error generating response: {}", e);
                let content = format_error_reply(&e.to_string());
                let outcome = HandleOutcome::Failed {
                    content: content.clone(),
                    error: e.to_string(),
                };
                (content, outcome)
            }
        };

        match tokio::time::timeout(self.timeout, self.sink.send(message.channel.id, &content)).await {
            Ok(sent) => sent?,
            Err(_) => {
                return Err(anyhow!(
                    "reply to channel {} not posted within {} seconds",
                    message.channel.id,
                    self.timeout.as_secs_f32()
                ))
            }
        };

        info!(
            "Responded to {} in {}, channel {}",
            message.author.display_name,
            message.server_name(),
            message.channel.name
        );
        Ok(outcome)
    }

    async fn respond(&self, message: &IncomingMessage, bot: &BotIdentity) -> Result<String> {
        match &self.responder {
            Responder::Stateless(model) => {
                let prompt = build_relay_prompt(&PromptContext::from(message));
                model.generate(&prompt).await
            }
            Responder::Conversation(chain) => {
                let input = strip_bot_mention(&message.content, bot.user_id);
                chain.predict(&input).await
            }
            Responder::Session(chain) => {
                let input = strip_bot_mention(&message.content, bot.user_id);
                chain.invoke(&input, &message.author.id.to_string()).await
            }
        }
    }
}
