pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// An inbound event from any platform. Not every update carries a message.
#[derive(Debug, Clone, Default)]
pub struct IncomingUpdate {
    pub message: Option<IncomingMessage>,
}

/// A message received from any platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform-specific chat/channel ID
    pub chat_id: i64,
    /// The message text, absent for stickers, locations, photos...
    pub text: Option<String>,
}

#[cfg(test)]
impl IncomingUpdate {
    pub fn with_text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            message: Some(IncomingMessage {
                chat_id,
                text: Some(text.into()),
            }),
        }
    }
}

/// Outbound operations a platform exposes to the dispatcher
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a Markdown-formatted text reply
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Upload an image, using `file_name` as its name
    async fn send_photo(&self, chat_id: i64, image: Vec<u8>, file_name: &str) -> Result<()>;
}
