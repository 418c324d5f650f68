//! Telegram Bot API implementation of [`MessagingGateway`].
//!
//! Every call is a single `POST /bot<token>/<method>`. Nothing is retried
//! here; the caller decides whether a failed send may be repeated.

use super::{ChannelId, InlineKeyboard, MessageId, MessagingGateway, PhotoSource};
use crate::errors::{GatewayError, GatewayErrorKind};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// All post bodies are rendered as Telegram HTML.
pub const PARSE_MODE: &str = "HTML";

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct BotApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<u16>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: MessageId,
}

#[derive(Serialize)]
struct SendPhotoByUrl<'a> {
    chat_id: &'a ChannelId,
    photo: &'a str,
    caption: &'a str,
    parse_mode: &'static str,
    reply_markup: &'a InlineKeyboard,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a ChannelId,
    text: &'a str,
    parse_mode: &'static str,
    reply_markup: &'a InlineKeyboard,
}

#[derive(Serialize)]
struct PinChatMessage<'a> {
    chat_id: &'a ChannelId,
    message_id: MessageId,
    disable_notification: bool,
}

#[derive(Serialize)]
struct UnpinChatMessage<'a> {
    chat_id: &'a ChannelId,
    message_id: MessageId,
}

#[derive(Serialize)]
struct EditMessageText<'a> {
    chat_id: &'a ChannelId,
    message_id: MessageId,
    text: &'a str,
    parse_mode: &'static str,
    reply_markup: &'a InlineKeyboard,
}

#[derive(Serialize)]
struct EditMessageCaption<'a> {
    chat_id: &'a ChannelId,
    message_id: MessageId,
    caption: &'a str,
    parse_mode: &'static str,
    reply_markup: &'a InlineKeyboard,
}

/// Bot API client bound to one bot token.
pub struct TelegramBotApi {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl TelegramBotApi {
    pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org/";

    pub fn new(token: impl Into<String>, base_url: Url) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
            token: token.into(),
        }
    }

    /// Replace the default `reqwest::Client`.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    fn method_url(&self, method: &str) -> Result<Url, GatewayError> {
        // The `./` keeps `bot<id>:<secret>` from parsing as a URL scheme.
        self.base_url
            .join(&format!("./bot{}/{}", self.token, method))
            .map_err(|e| GatewayError::new(GatewayErrorKind::Unknown, format!("invalid api url: {e}")))
    }

    async fn call<P: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &P,
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .post(self.method_url(method)?)
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;
        decode(method, response).await
    }

    async fn edit<P: Serialize + ?Sized>(&self, method: &str, payload: &P) -> Result<(), GatewayError> {
        match self.call::<_, IgnoredAny>(method, payload).await {
            Ok(_) => Ok(()),
            // Re-rendering an unchanged post is a successful no-op.
            Err(e) if e.detail.contains("message is not modified") => {
                debug!(method, "Edit skipped, message is not modified");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MessagingGateway for TelegramBotApi {
    async fn send_photo(
        &self,
        channel: &ChannelId,
        photo: PhotoSource,
        caption: &str,
        markup: &InlineKeyboard,
    ) -> Result<MessageId, GatewayError> {
        let sent: SentMessage = match photo {
            PhotoSource::Url(url) => {
                self.call(
                    "sendPhoto",
                    &SendPhotoByUrl {
                        chat_id: channel,
                        photo: &url,
                        caption,
                        parse_mode: PARSE_MODE,
                        reply_markup: markup,
                    },
                )
                .await?
            }
            PhotoSource::Bytes { data, file_name } => {
                let reply_markup = serde_json::to_string(markup).map_err(|e| {
                    GatewayError::new(GatewayErrorKind::InvalidFormat, e.to_string())
                })?;
                let form = Form::new()
                    .text("chat_id", channel.as_str().to_string())
                    .text("caption", caption.to_string())
                    .text("parse_mode", PARSE_MODE)
                    .text("reply_markup", reply_markup)
                    .part("photo", Part::bytes(data.to_vec()).file_name(file_name));
                let response = self
                    .http
                    .post(self.method_url("sendPhoto")?)
                    .multipart(form)
                    .send()
                    .await
                    .map_err(transport_error)?;
                decode("sendPhoto", response).await?
            }
        };
        Ok(sent.message_id)
    }

    async fn send_text(
        &self,
        channel: &ChannelId,
        body: &str,
        markup: &InlineKeyboard,
    ) -> Result<MessageId, GatewayError> {
        let sent: SentMessage = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id: channel,
                    text: body,
                    parse_mode: PARSE_MODE,
                    reply_markup: markup,
                },
            )
            .await?;
        Ok(sent.message_id)
    }

    async fn pin(&self, channel: &ChannelId, message_id: MessageId) -> Result<(), GatewayError> {
        let _: IgnoredAny = self
            .call(
                "pinChatMessage",
                &PinChatMessage {
                    chat_id: channel,
                    message_id,
                    disable_notification: false,
                },
            )
            .await?;
        Ok(())
    }

    async fn unpin(&self, channel: &ChannelId, message_id: MessageId) -> Result<(), GatewayError> {
        let _: IgnoredAny = self
            .call(
                "unpinChatMessage",
                &UnpinChatMessage {
                    chat_id: channel,
                    message_id,
                },
            )
            .await?;
        Ok(())
    }

    async fn edit_text(
        &self,
        channel: &ChannelId,
        message_id: MessageId,
        body: &str,
        markup: &InlineKeyboard,
    ) -> Result<(), GatewayError> {
        self.edit(
            "editMessageText",
            &EditMessageText {
                chat_id: channel,
                message_id,
                text: body,
                parse_mode: PARSE_MODE,
                reply_markup: markup,
            },
        )
        .await
    }

    async fn edit_caption(
        &self,
        channel: &ChannelId,
        message_id: MessageId,
        caption: &str,
        markup: &InlineKeyboard,
    ) -> Result<(), GatewayError> {
        self.edit(
            "editMessageCaption",
            &EditMessageCaption {
                chat_id: channel,
                message_id,
                caption,
                parse_mode: PARSE_MODE,
                reply_markup: markup,
            },
        )
        .await
    }
}

/// Transport failures never reach Telegram's classifier. The URL is
/// stripped because it contains the bot token.
fn transport_error(e: reqwest::Error) -> GatewayError {
    GatewayError::new(GatewayErrorKind::Unknown, e.without_url().to_string())
}

async fn decode<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let status = response.status().as_u16();
    let body: BotApiResponse<T> = response.json().await.map_err(|e| {
        GatewayError::new(
            GatewayErrorKind::Unknown,
            format!("{method}: undecodable response (HTTP {status}): {}", e.without_url()),
        )
    })?;
    interpret(status, body)
}

fn interpret<T>(status: u16, body: BotApiResponse<T>) -> Result<T, GatewayError> {
    if body.ok {
        return body
            .result
            .ok_or_else(|| GatewayError::new(GatewayErrorKind::Unknown, "ok response without result"));
    }
    let code = body.error_code.unwrap_or(status);
    let description = body
        .description
        .unwrap_or_else(|| format!("HTTP {status}"));
    Err(GatewayError::new(classify(code, &description), description))
}

/// Map a Bot API failure onto the gateway error taxonomy.
pub fn classify(error_code: u16, description: &str) -> GatewayErrorKind {
    let description = description.to_lowercase();
    if description.contains("chat not found") || description.contains("channel not found") {
        GatewayErrorKind::ChannelNotFound
    } else if error_code == 403
        || description.contains("not enough rights")
        || description.contains("have no rights")
        || description.contains("administrator rights")
    {
        GatewayErrorKind::InsufficientPermissions
    } else if error_code == 400 || description.starts_with("bad request") {
        GatewayErrorKind::InvalidFormat
    } else {
        GatewayErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(400, "Bad Request: chat not found"),
            GatewayErrorKind::ChannelNotFound
        );
        assert_eq!(
            classify(400, "Bad Request: not enough rights to pin a message"),
            GatewayErrorKind::InsufficientPermissions
        );
        assert_eq!(
            classify(403, "Forbidden: bot is not a member of the channel chat"),
            GatewayErrorKind::InsufficientPermissions
        );
        assert_eq!(
            classify(400, "Bad Request: can't parse entities: Unsupported start tag"),
            GatewayErrorKind::InvalidFormat
        );
        assert_eq!(
            classify(429, "Too Many Requests: retry after 5"),
            GatewayErrorKind::Unknown
        );
        assert_eq!(classify(502, "Bad Gateway"), GatewayErrorKind::Unknown);
        assert_eq!(
            classify(400, "Bad Request: message to unpin not found"),
            GatewayErrorKind::InvalidFormat
        );
    }

    #[test]
    fn test_interpret_success() {
        let body: BotApiResponse<SentMessage> =
            serde_json::from_str(r#"{"ok":true,"result":{"message_id":77,"date":0}}"#).unwrap();
        let sent = interpret(200, body).unwrap();
        assert_eq!(sent.message_id, 77);
    }

    #[test]
    fn test_interpret_failure_keeps_description() {
        let body: BotApiResponse<SentMessage> = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
        )
        .unwrap();
        let err = interpret(400, body).unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::ChannelNotFound);
        assert_eq!(err.detail, "Bad Request: chat not found");
    }

    #[test]
    fn test_interpret_falls_back_to_http_status() {
        let body: BotApiResponse<IgnoredAny> = serde_json::from_str(r#"{"ok":false}"#).unwrap();
        let err = interpret(403, body).unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::InsufficientPermissions);
        assert_eq!(err.detail, "HTTP 403");
    }

    #[test]
    fn test_method_url() {
        let api = TelegramBotApi::new(
            "123:abc",
            Url::parse(TelegramBotApi::DEFAULT_BASE_URL).unwrap(),
        );
        assert_eq!(
            api.method_url("sendPhoto").unwrap().as_str(),
            "https://api.telegram.org/bot123:abc/sendPhoto"
        );
    }

    #[test]
    fn test_keyboard_wire_shape() {
        let keyboard = InlineKeyboard::single("📲 Подать объявление", "https://t.me/bot/app");
        let value = serde_json::to_value(&keyboard).unwrap();
        assert_eq!(value["inline_keyboard"][0][0]["url"], "https://t.me/bot/app");
    }
}
