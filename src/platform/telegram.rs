use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, UpdateKind};
use tracing::info;

use crate::dispatcher::UpdateDispatcher;
use crate::platform::{IncomingMessage, IncomingUpdate, Transport};

/// `Transport` backed by the Telegram Bot API
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        #[allow(deprecated)]
        let parse_mode = ParseMode::Markdown;

        self.bot
            .send_message(ChatId(chat_id), text.to_string())
            .parse_mode(parse_mode)
            .await
            .context("Failed to send message")?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, image: Vec<u8>, file_name: &str) -> Result<()> {
        let photo = InputFile::memory(image).file_name(file_name.to_string());

        self.bot
            .send_photo(ChatId(chat_id), photo)
            .await
            .context("Failed to send photo")?;
        Ok(())
    }
}

/// Run the Telegram bot platform
pub async fn run(dispatcher: Arc<UpdateDispatcher>, bot: Bot) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = dptree::entry().endpoint(handle_update);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn to_incoming(update: Update) -> IncomingUpdate {
    let message = match update.kind {
        UpdateKind::Message(msg) => Some(IncomingMessage {
            chat_id: msg.chat.id.0,
            text: msg.text().map(str::to_string),
        }),
        _ => None,
    };
    IncomingUpdate { message }
}

async fn handle_update(
    bot: Bot,
    update: Update,
    dispatcher: Arc<UpdateDispatcher>,
) -> ResponseResult<()> {
    let transport = TelegramTransport::new(bot);
    dispatcher.handle(&to_incoming(update), &transport).await;
    Ok(())
}
