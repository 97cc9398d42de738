//! Echo Bot Demo
//!
//! A console bot demonstrating the Switchboard dispatch pipeline: stdin
//! lines become text updates, replies print to stdout. Try:
//!
//! ```text
//! /echo hello there
//! /ping
//! /help
//! 🔔 Subscribe
//! anything else
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use switchboard::prelude::*;
use switchboard::switchboard_core::error::SendError;
use switchboard::{ConfigLoader, Runtime};

/// The single "chat" a console session talks in.
const CONSOLE_CHAT: ChatId = 1;

// ============================================================================
// Console collaborators
// ============================================================================

/// Sender that prints outbound messages to stdout.
struct ConsoleSender;

#[async_trait]
impl Sender for ConsoleSender {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), SendError> {
        println!("[chat {chat_id}] {text}");
        Ok(())
    }
}

/// Update source that turns stdin lines into text updates.
struct StdinSource {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinSource {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl UpdateSource for StdinSource {
    async fn next_update(&mut self) -> Option<Update> {
        let line = self.lines.next_line().await.ok().flatten()?;
        Some(Update::from_text(CONSOLE_CHAT, line))
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn register_handlers(bot: &Dispatcher) -> Result<()> {
    bot.register_command(
        "/echo",
        handler_fn(|bot, update| {
            Box::pin(async move {
                let message = update.message.as_ref().ok_or("no message")?;
                let reply = message.command_arguments().unwrap_or("(nothing to echo)");
                bot.send_text(update.chat_id(), reply).await?;
                Ok(())
            })
        }),
        0,
    )
    .await?;

    bot.register_command(
        "/ping",
        handler_fn(|bot, update| {
            Box::pin(async move {
                bot.send_text(update.chat_id(), "pong").await?;
                Ok(())
            })
        }),
        0,
    )
    .await?;

    bot.register_command(
        "/help",
        handler_fn(|bot, update| {
            Box::pin(async move {
                bot.send_text(
                    update.chat_id(),
                    "commands: /echo <text>, /ping, /help; or press 🔔 Subscribe",
                )
                .await?;
                Ok(())
            })
        }),
        0,
    )
    .await?;

    // Keyboard-style command: matched by literal message text.
    bot.register_keyboard_command(
        "🔔 Subscribe",
        handler_fn(|bot, update| {
            Box::pin(async move {
                bot.send_text(update.chat_id(), "subscribed!").await?;
                Ok(())
            })
        }),
        0,
    )
    .await?;

    // Fallback for everything that is not a command.
    bot.register_plain_text_handler(
        handler_fn(|bot, update| {
            Box::pin(async move {
                let text = update
                    .message
                    .as_ref()
                    .and_then(|m| m.text.as_deref())
                    .unwrap_or_default();
                bot.send_text(update.chat_id(), &format!("you said: {text}"))
                    .await?;
                Ok(())
            })
        }),
        0,
    )
    .await?;

    Ok(())
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::new().load()?;
    let _guard = switchboard::switchboard_runtime::logging::init_from_config(&config.logging)?;

    let bot = Dispatcher::new(Arc::new(InMemoryStorage::new()), Arc::new(ConsoleSender));
    register_handlers(&bot).await?;

    info!("echo bot ready, type a line (Ctrl-C to quit)");
    let runtime = Runtime::from_config(bot, &config);
    runtime.run_until_ctrl_c(StdinSource::new()).await;

    Ok(())
}
