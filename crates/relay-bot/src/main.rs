// ============================================================================
// relay-bot — Discord gateway front-end for relay-core
// ============================================================================
// Usage:
//   relay-bot                              Stateless relay (default)
//   relay-bot --mode vector-memory         Mention-gated, vector memory
//   relay-bot --mode session-memory        Same, via session history
//   relay-bot --env-file ./bot.env         Load settings from another file
// ============================================================================

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use relay_core::{
    Author, BotIdentity, ChannelInfo, GuildInfo, HandleOutcome, IncomingMessage, RelayConfig,
    RelayHandler, RelayMode,
};
use serenity::all::{Client, Context, EventHandler, GatewayIntents, GuildId, Message, Ready};
use serenity::async_trait;
use tracing::{debug, error, info, warn};

/// Relay Discord messages to Gemini and post the replies
#[derive(Parser)]
#[command(name = "relay-bot", version, about = "Relay Discord messages to Gemini and post the replies")]
struct Cli {
    /// Relay pipeline to run
    #[arg(long, value_enum, env = "RELAY_MODE", default_value = "stateless")]
    mode: Mode,

    /// Load environment variables from this file in addition to ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Stateless,
    VectorMemory,
    SessionMemory,
}

impl From<Mode> for RelayMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Stateless => RelayMode::Stateless,
            Mode::VectorMemory => RelayMode::VectorMemory,
            Mode::SessionMemory => RelayMode::SessionMemory,
        }
    }
}

/// Gateway event handler; the relay handler is shared by every event
struct Bot {
    handler: Arc<RelayHandler>,
    identity: OnceLock<BotIdentity>,
    allowed_channels: Vec<String>,
}

impl Bot {
    fn new(handler: RelayHandler, allowed_channels: Vec<String>) -> Self {
        Self {
            handler: Arc::new(handler),
            identity: OnceLock::new(),
            allowed_channels,
        }
    }
}

#[async_trait]
impl EventHandler for Bot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let _ = self.identity.set(BotIdentity::new(ready.user.id.get()));

        info!("{} has connected to Discord!", ready.user.name);
        info!("Bot is ready in {} servers", ready.guilds.len());
    }

    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        for guild_id in guilds {
            let name = guild_id
                .name(&ctx)
                .unwrap_or_else(|| guild_id.to_string());
            info!("Connected to server: {}", name);
        }
        info!("Allowed channels: {:?}", self.allowed_channels);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let Some(bot) = self.identity.get().copied() else {
            debug!("Message received before ready, skipping");
            return;
        };

        if is_own_message(msg.author.id.get(), &bot) {
            return;
        }

        let incoming = to_incoming(&ctx, &msg).await;

        match self.handler.handle(&incoming, &bot).await {
            Ok(HandleOutcome::Ignored(reason)) => {
                debug!("Ignored message {}: {}", msg.id, reason);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to reply in channel {}: {:#}", msg.channel_id, e);
            }
        }
    }
}

/// Convert a gateway message into the relay's view of it
async fn to_incoming(ctx: &Context, msg: &Message) -> IncomingMessage {
    let guild = msg.guild_id.map(|id| GuildInfo {
        id: id.get(),
        name: id.name(ctx).unwrap_or_default(),
    });

    let channel_name = match msg.channel_id.name(ctx).await {
        Ok(name) => name,
        Err(e) => {
            debug!("Could not resolve channel {} name: {}", msg.channel_id, e);
            String::new()
        }
    };

    let nick = msg.member.as_ref().and_then(|m| m.nick.as_deref());

    IncomingMessage {
        author: Author {
            id: msg.author.id.get(),
            name: msg.author.name.clone(),
            display_name: display_name(nick, msg.author.global_name.as_deref(), &msg.author.name),
        },
        guild,
        channel: ChannelInfo {
            id: msg.channel_id.get(),
            name: channel_name,
        },
        content: msg.content.clone(),
        mentions: msg.mentions.iter().map(|u| u.id.get()).collect(),
    }
}

/// Guild nickname, then global display name, then user name
fn display_name(nick: Option<&str>, global_name: Option<&str>, user_name: &str) -> String {
    let non_blank = |n: &&str| !n.trim().is_empty();
    nick.filter(non_blank)
        .or(global_name.filter(non_blank))
        .unwrap_or(user_name)
        .to_string()
}

/// Own messages are dropped before any name lookups
fn is_own_message(author_id: u64, bot: &BotIdentity) -> bool {
    author_id == bot.user_id
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    let dotenv_result = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load env file {}", path.display()))?;
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relay_bot=info".parse()?)
                .add_directive("relay_core=info".parse()?),
        )
        .init();

    if let Err(e) = dotenv_result {
        warn!("Could not load .env file: {}", e);
    }

    info!("Initializing Gemini Discord Bot...");

    let config = RelayConfig::from_env().context("Invalid configuration")?;
    let mode = RelayMode::from(cli.mode);
    let handler = relay_core::build_handler(&config, mode).await?;

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(Bot::new(handler, config.allow_list.channels.clone()))
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    client
        .start()
        .await
        .context("Discord client stopped with an error")?;

    Ok(())
}
