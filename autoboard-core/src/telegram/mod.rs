//! Messaging gateway abstraction.
//!
//! The publisher, scheduler and synchronizer receive an
//! `Arc<dyn MessagingGateway>` at construction. The production
//! implementation is [`bot_api::TelegramBotApi`].

pub mod bot_api;

use crate::errors::GatewayError;
use async_trait::async_trait;
use serde::Serialize;

pub use bot_api::TelegramBotApi;

/// Identifier of a channel message.
pub type MessageId = i64;

/// Destination chat: a numeric id (`-100…`) or a public `@username`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the post image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    /// Raw bytes, uploaded with the request.
    Bytes {
        data: bytes::Bytes,
        file_name: String,
    },
    /// A public URL Telegram downloads itself.
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub url: String,
}

/// Inline keyboard attached under a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// A keyboard with a single URL button.
    pub fn single(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            inline_keyboard: vec![vec![InlineButton {
                text: text.into(),
                url: url.into(),
            }]],
        }
    }
}

/// Operations the engine needs from the messaging transport.
///
/// Implementations must not retry sends internally: a retried send can
/// produce a duplicate channel post.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_photo(
        &self,
        channel: &ChannelId,
        photo: PhotoSource,
        caption: &str,
        markup: &InlineKeyboard,
    ) -> Result<MessageId, GatewayError>;

    async fn send_text(
        &self,
        channel: &ChannelId,
        body: &str,
        markup: &InlineKeyboard,
    ) -> Result<MessageId, GatewayError>;

    async fn pin(&self, channel: &ChannelId, message_id: MessageId) -> Result<(), GatewayError>;

    async fn unpin(&self, channel: &ChannelId, message_id: MessageId) -> Result<(), GatewayError>;

    async fn edit_text(
        &self,
        channel: &ChannelId,
        message_id: MessageId,
        body: &str,
        markup: &InlineKeyboard,
    ) -> Result<(), GatewayError>;

    /// Photo posts can only be edited through their caption.
    async fn edit_caption(
        &self,
        channel: &ChannelId,
        message_id: MessageId,
        caption: &str,
        markup: &InlineKeyboard,
    ) -> Result<(), GatewayError>;
}
