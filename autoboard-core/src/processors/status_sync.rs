//! StatusSynchronizer.
//!
//! Moves an ad out of `Active` and re-renders its channel post with the
//! matching status banner. The stored status is the source of truth: a
//! failed edit is only a warning.

use crate::entities::AdStatus;
use crate::entities::PostKind;
use crate::errors::StatusError;
use crate::formatter::{PostTemplate, Surface};
use crate::store::AdStore;
use crate::telegram::{ChannelId, InlineKeyboard, MessagingGateway};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub ad_id: i64,
    pub status: AdStatus,
    /// Whether the channel post now shows the new status.
    pub channel_synced: bool,
}

pub struct StatusSynchronizer {
    store: Arc<dyn AdStore>,
    gateway: Arc<dyn MessagingGateway>,
    channel: ChannelId,
    keyboard: InlineKeyboard,
}

impl StatusSynchronizer {
    pub fn new(
        store: Arc<dyn AdStore>,
        gateway: Arc<dyn MessagingGateway>,
        channel: ChannelId,
        keyboard: InlineKeyboard,
    ) -> Self {
        Self {
            store,
            gateway,
            channel,
            keyboard,
        }
    }

    pub async fn set_status(&self, ad_id: i64, target: AdStatus) -> Result<StatusChange, StatusError> {
        let ad = self
            .store
            .get_ad(ad_id)
            .await?
            .ok_or(StatusError::NotFound(ad_id))?;

        if !ad.status.can_transition_to(target) {
            return Err(StatusError::InvalidTransition {
                ad_id,
                from: ad.status,
                to: target,
            });
        }

        // Lost a race with another status change.
        if !self.store.update_status(ad_id, target).await? {
            let from = self
                .store
                .get_ad(ad_id)
                .await?
                .map(|a| a.status)
                .unwrap_or(ad.status);
            return Err(StatusError::InvalidTransition {
                ad_id,
                from,
                to: target,
            });
        }
        info!(ad_id, from = %ad.status, to = %target, "Ad status changed");

        let Some(message_id) = ad.channel_message_id else {
            return Ok(StatusChange {
                ad_id,
                status: target,
                channel_synced: false,
            });
        };

        let template = PostTemplate::new(&ad, ad.tariff).with_status(target);
        let edited = match ad.channel_post_kind {
            Some(PostKind::Photo) => {
                let caption = template.render(Surface::Caption);
                self.gateway
                    .edit_caption(&self.channel, message_id, &caption, &self.keyboard)
                    .await
            }
            Some(PostKind::Text) | None => {
                let body = template.render(Surface::Message);
                self.gateway
                    .edit_text(&self.channel, message_id, &body, &self.keyboard)
                    .await
            }
        };

        let channel_synced = match edited {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    ad_id,
                    message_id,
                    status = %target,
                    kind = %e.kind,
                    error = %e.detail,
                    "Failed to update channel post"
                );
                false
            }
        };

        Ok(StatusChange {
            ad_id,
            status: target,
            channel_synced,
        })
    }
}
