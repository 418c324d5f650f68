//! ChannelPublisher.
//!
//! Sends a rendered ad to the broadcast channel and applies the tariff's
//! pin policy to the new message. Publishing is split in two steps so the
//! caller can persist the message id in between:
//!
//! 1. [`ChannelPublisher::send_post`]: photo with caption, or text when
//!    there is no photo. A failure is returned with tariff and channel
//!    context and is never retried here.
//! 2. [`ChannelPublisher::apply_pin_policy`]: pin, then arm the unpin.
//!    Neither step can fail the publication.

use super::unpin_scheduler::UnpinScheduler;
use crate::entities::ads::Ad;
use crate::entities::{PostKind, Tariff};
use crate::errors::ChannelError;
use crate::formatter::{PostTemplate, Surface};
use crate::telegram::{ChannelId, InlineKeyboard, MessageId, MessagingGateway, PhotoSource};
use crate::utils::clock::Clock;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Label of the button attached under every post.
pub const SUBMIT_BUTTON_TEXT: &str = "📲 Подать объявление";

/// A message that now exists in the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentPost {
    pub message_id: MessageId,
    pub kind: PostKind,
    pub sent_at: time::PrimitiveDateTime,
}

pub struct ChannelPublisher {
    gateway: Arc<dyn MessagingGateway>,
    channel: ChannelId,
    keyboard: InlineKeyboard,
    scheduler: UnpinScheduler,
    clock: Arc<dyn Clock>,
}

impl ChannelPublisher {
    /// `submit_url` is the target of the button attached under every post.
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        channel: ChannelId,
        submit_url: &str,
        scheduler: UnpinScheduler,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            channel,
            keyboard: InlineKeyboard::single(SUBMIT_BUTTON_TEXT, submit_url),
            scheduler,
            clock,
        }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn keyboard(&self) -> &InlineKeyboard {
        &self.keyboard
    }

    /// Send `ad` to the channel, with `photo` as the post image when given.
    pub async fn send_post(
        &self,
        ad: &Ad,
        photo: Option<PhotoSource>,
    ) -> Result<SentPost, ChannelError> {
        let template = PostTemplate::new(ad, ad.tariff);
        let sent = match photo {
            Some(photo) => {
                let caption = template.render(Surface::Caption);
                self.gateway
                    .send_photo(&self.channel, photo, &caption, &self.keyboard)
                    .await
                    .map(|id| (id, PostKind::Photo))
            }
            None => {
                let body = template.render(Surface::Message);
                self.gateway
                    .send_text(&self.channel, &body, &self.keyboard)
                    .await
                    .map(|id| (id, PostKind::Text))
            }
        };

        match sent {
            Ok((message_id, kind)) => {
                info!(
                    ad_id = ad.id,
                    message_id,
                    tariff = %ad.tariff,
                    kind = ?kind,
                    "Ad posted to channel"
                );
                Ok(SentPost {
                    message_id,
                    kind,
                    sent_at: self.clock.now(),
                })
            }
            Err(e) => Err(ChannelError {
                kind: e.kind,
                tariff: ad.tariff,
                channel: self.channel.clone(),
                detail: e.detail,
            }),
        }
    }

    /// Pin `message_id` if `tariff` pins, and arm its unpin.
    ///
    /// Returns whether the message is pinned. A failed pin is a warning and
    /// arms nothing. A failed arm is logged as an error; the message stays
    /// pinned.
    pub async fn apply_pin_policy(&self, ad_id: i64, tariff: Tariff, message_id: MessageId) -> bool {
        let policy = tariff.pin_policy();
        if !policy.pins() {
            return false;
        }

        if let Err(e) = self.gateway.pin(&self.channel, message_id).await {
            warn!(
                ad_id,
                message_id,
                tariff = %tariff,
                kind = %e.kind,
                error = %e.detail,
                "Failed to pin channel post"
            );
            return false;
        }

        let pinned_at = self.clock.now();
        if let Err(e) = self
            .scheduler
            .arm(ad_id, message_id, pinned_at, policy)
            .await
        {
            error!(
                ad_id,
                message_id,
                tariff = %tariff,
                error = %e,
                "Failed to arm unpin, post stays pinned"
            );
        }
        true
    }
}
