use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::CommandConfig;
use crate::markdown::{escape_markdown, escape_underscores, resolve_emoji};
use crate::platform::{IncomingUpdate, Transport};
use crate::pricing::{PricingError, PricingService};

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("Invalid currency request: {0}")]
    InvalidCurrency(String),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Transport(anyhow::Error),
}

/// A recognised command, borrowing its slug from the message text
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Text { slug: &'a str },
    Image { slug: &'a str },
}

/// Index where the currency slug ends: the first '@' (mention suffix) or the end of the text
pub fn currency_end(command: &str) -> usize {
    command.find('@').unwrap_or(command.len())
}

/// Slug between `prefix` and the currency end. Empty or inverted ranges are invalid.
pub fn extract_slug<'a>(command: &'a str, prefix: &str) -> Result<&'a str, CommandError> {
    command
        .get(prefix.len()..currency_end(command))
        .filter(|slug| !slug.is_empty())
        .ok_or_else(|| CommandError::InvalidCurrency(command.to_string()))
}

/// Stateless per-update handler: resolves prefix commands and answers through a `Transport`
pub struct UpdateDispatcher {
    commands: CommandConfig,
    pricing: Arc<dyn PricingService>,
}

impl UpdateDispatcher {
    pub fn new(commands: CommandConfig, pricing: Arc<dyn PricingService>) -> Self {
        Self { commands, pricing }
    }

    /// Match `command` against the configured prefixes, text mode first
    pub fn resolve<'a>(&self, command: &'a str) -> Result<Option<Command<'a>>, CommandError> {
        if let Some(prefix) = self.commands.text_prefix() {
            if command.starts_with(prefix) {
                let slug = extract_slug(command, prefix)?;
                return Ok(Some(Command::Text { slug }));
            }
        }

        if let Some(prefix) = self.commands.image_prefix() {
            if command.starts_with(prefix) {
                let slug = extract_slug(command, prefix)?;
                return Ok(Some(Command::Image { slug }));
            }
        }

        Ok(None)
    }

    /// Handle one update. Sends at most one reply, plus one error reply on failure.
    pub async fn handle(&self, update: &IncomingUpdate, transport: &dyn Transport) {
        let Some(message) = &update.message else {
            return;
        };
        let Some(command) = message.text.as_deref() else {
            return;
        };

        info!("Message in chat {}: {}", message.chat_id, command);

        if let Err(e) = self.answer(message.chat_id, command, transport).await {
            error!("Failed to answer {:?}: {:#}", command, e);

            let body = escape_underscores(&e.to_string());
            if let Err(send_err) = transport.send_message(message.chat_id, &body).await {
                error!(
                    "Failed to send error reply to chat {}: {:#}",
                    message.chat_id, send_err
                );
            }
        }
    }

    async fn answer(
        &self,
        chat_id: i64,
        command: &str,
        transport: &dyn Transport,
    ) -> Result<(), CommandError> {
        match self.resolve(command)? {
            Some(Command::Text { slug }) => {
                debug!("Text request for {}", slug);
                let details = self.pricing.format_currency_details(slug).await?;
                let body = escape_markdown(&resolve_emoji(&details));
                transport
                    .send_message(chat_id, &body)
                    .await
                    .map_err(CommandError::Transport)
            }
            Some(Command::Image { slug }) => {
                debug!("Image request for {}", slug);
                let image = self.pricing.render_currency_image(slug).await?;
                transport
                    .send_photo(chat_id, image, command)
                    .await
                    .map_err(CommandError::Transport)
            }
            None => Ok(()),
        }
    }
}
