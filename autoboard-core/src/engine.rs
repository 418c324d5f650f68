//! AdEngine: the entry point for `publish`, `retry_publish` and `set_status`.
//!
//! Publication order:
//!
//! 1. validate the submission (no I/O)
//! 2. find or create the submitting user
//! 3. insert the ad and its photos in one transaction
//! 4. send the post to the channel
//! 5. store the channel message id
//! 6. pin and arm the unpin, per the tariff
//!
//! A failure in 2–3 aborts before any channel call. A failed send leaves the
//! ad `Active` without a message id; `retry_publish` resumes from step 4.
//!
//! Once the post is live nothing aborts the publication. If step 5 fails the
//! post is still pinned and reported, and the engine keeps the message id in
//! memory; `retry_publish` then stores it instead of sending a second post.

use crate::entities::ad_photos::AdPhoto;
use crate::entities::ads::{Ad, AdInsert};
use crate::entities::{AdStatus, Tariff};
use crate::errors::{PublishError, StatusError, ValidationError};
use crate::media::MediaResolver;
use crate::processors::{ChannelPublisher, SentPost, StatusChange, StatusSynchronizer};
use crate::store::AdStore;
use crate::telegram::{MessageId, PhotoSource};
use autoboard_sdk::objects::{AdSubmission, TariffId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Successful publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOutcome {
    pub ad_id: i64,
    pub message_id: MessageId,
    pub pinned: bool,
}

/// A live channel post whose message id could not be stored.
#[derive(Debug, Clone, Copy)]
struct UnrecordedPost {
    sent: SentPost,
    pinned: bool,
}

pub struct AdEngine {
    store: Arc<dyn AdStore>,
    media: Arc<dyn MediaResolver>,
    publisher: ChannelPublisher,
    synchronizer: StatusSynchronizer,
    unrecorded: Mutex<HashMap<i64, UnrecordedPost>>,
}

impl AdEngine {
    pub fn new(
        store: Arc<dyn AdStore>,
        media: Arc<dyn MediaResolver>,
        publisher: ChannelPublisher,
        synchronizer: StatusSynchronizer,
    ) -> Self {
        Self {
            store,
            media,
            publisher,
            synchronizer,
            unrecorded: Mutex::new(HashMap::new()),
        }
    }

    #[tracing::instrument(skip_all, fields(user_id = submission.user_id, tariff = %submission.tariff))]
    pub async fn publish(&self, submission: AdSubmission) -> Result<PublishOutcome, PublishError> {
        let tariff = validate_submission(&submission)?;

        let user = self
            .store
            .find_or_create_user(submission.user_id, clean(submission.user_name.clone()))
            .await?;

        let photos = submission.photos.clone();
        let (ad, photos) = self
            .store
            .insert_ad(ad_insert(submission, user.id, tariff), photos)
            .await?;
        info!(ad_id = ad.id, owner_id = user.id, photos = photos.len(), "Ad created");

        self.send_and_pin(&ad, &photos).await
    }

    /// Re-send an active ad that has no channel post yet.
    ///
    /// If an earlier attempt did post but failed to store the message id,
    /// the id is stored now and nothing is sent.
    #[tracing::instrument(skip(self))]
    pub async fn retry_publish(&self, ad_id: i64) -> Result<PublishOutcome, PublishError> {
        let ad = self
            .store
            .get_ad(ad_id)
            .await?
            .ok_or(PublishError::NotFound(ad_id))?;

        if ad.status != AdStatus::Active {
            return Err(PublishError::NotPublishable {
                ad_id,
                reason: "ad is no longer active",
            });
        }
        if ad.channel_message_id.is_some() {
            return Err(PublishError::NotPublishable {
                ad_id,
                reason: "ad already has a channel post",
            });
        }

        {
            let mut unrecorded = self.unrecorded.lock().await;
            if let Some(post) = unrecorded.get(&ad_id).copied() {
                let SentPost {
                    message_id,
                    kind,
                    sent_at,
                } = post.sent;
                let stored = self
                    .store
                    .set_channel_post(ad_id, message_id, kind, sent_at)
                    .await?;
                unrecorded.remove(&ad_id);
                if !stored {
                    return Err(PublishError::NotPublishable {
                        ad_id,
                        reason: "ad already has a channel post",
                    });
                }
                info!(ad_id, message_id, "Stored message id of live post");
                return Ok(PublishOutcome {
                    ad_id,
                    message_id,
                    pinned: post.pinned,
                });
            }
        }

        let photos = self.store.get_photos(ad_id).await?;
        self.send_and_pin(&ad, &photos).await
    }

    pub async fn set_status(&self, ad_id: i64, status: AdStatus) -> Result<StatusChange, StatusError> {
        self.synchronizer.set_status(ad_id, status).await
    }

    async fn send_and_pin(&self, ad: &Ad, photos: &[AdPhoto]) -> Result<PublishOutcome, PublishError> {
        let photo = self.cover_photo(ad.id, photos).await;

        let sent = match self.publisher.send_post(ad, photo).await {
            Ok(sent) => sent,
            Err(e) => {
                error!(ad_id = ad.id, error = %e, "Channel send failed, ad left without post");
                return Err(e.into());
            }
        };

        let stored = match self
            .store
            .set_channel_post(ad.id, sent.message_id, sent.kind, sent.sent_at)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                error!(
                    ad_id = ad.id,
                    message_id = sent.message_id,
                    "Ad already had a channel post, new post is orphaned and must be deleted"
                );
                return Err(PublishError::NotPublishable {
                    ad_id: ad.id,
                    reason: "ad already has a channel post",
                });
            }
            Err(e) => {
                error!(
                    ad_id = ad.id,
                    message_id = sent.message_id,
                    error = %e,
                    "Channel post is live but its message id was not stored"
                );
                false
            }
        };

        let pinned = self
            .publisher
            .apply_pin_policy(ad.id, ad.tariff, sent.message_id)
            .await;

        if !stored {
            self.unrecorded
                .lock()
                .await
                .insert(ad.id, UnrecordedPost { sent, pinned });
        }

        Ok(PublishOutcome {
            ad_id: ad.id,
            message_id: sent.message_id,
            pinned,
        })
    }

    /// The first photo, or `None` to fall back to a text post.
    async fn cover_photo(&self, ad_id: i64, photos: &[AdPhoto]) -> Option<PhotoSource> {
        let first = photos.iter().min_by_key(|p| p.order_index)?;
        match self.media.resolve(&first.storage_ref).await {
            Ok(source) => source,
            Err(e) => {
                warn!(ad_id, error = %e, "Cover photo unavailable, posting as text");
                None
            }
        }
    }
}

/// Check a submission before any I/O and resolve its tariff.
pub fn validate_submission(submission: &AdSubmission) -> Result<Tariff, ValidationError> {
    if submission.user_id <= 0 {
        return Err(ValidationError::InvalidUser(submission.user_id));
    }

    let required = [
        ("brand", &submission.brand),
        ("model", &submission.model),
        ("year", &submission.year),
        ("mileage", &submission.mileage),
        ("price", &submission.price),
    ];
    let missing: Vec<&'static str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    submission
        .tariff
        .trim()
        .parse::<TariffId>()
        .map(Tariff::from)
        .map_err(|_| ValidationError::UnknownTariff(submission.tariff.clone()))
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn ad_insert(submission: AdSubmission, owner_id: i64, tariff: Tariff) -> AdInsert {
    AdInsert {
        owner_id,
        brand: submission.brand.trim().to_string(),
        model: submission.model.trim().to_string(),
        modification: clean(submission.modification),
        year: submission.year.trim().to_string(),
        engine: clean(submission.engine),
        power: clean(submission.power),
        mileage: submission.mileage.trim().to_string(),
        drivetrain: clean(submission.drivetrain),
        description: submission.description.trim().to_string(),
        city: clean(submission.city),
        price: submission.price.trim().to_string(),
        phone: clean(submission.phone),
        telegram: clean(submission.telegram),
        show_phone: submission.show_phone,
        show_telegram: submission.show_telegram,
        tariff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PostKind;
    use crate::errors::{GatewayError, GatewayErrorKind};
    use crate::events::unpin_armed_channel;
    use crate::processors::UnpinScheduler;
    use crate::telegram::ChannelId;
    use crate::testing::{GatewayCall, MemoryStore, RecordingGateway, StubMediaResolver, T0};
    use crate::utils::clock::ManualClock;
    use autoboard_sdk::objects::ErrorKind;
    use std::sync::atomic::Ordering;

    struct Harness {
        store: Arc<MemoryStore>,
        gateway: Arc<RecordingGateway>,
        engine: AdEngine,
    }

    fn harness_with_media(media: StubMediaResolver) -> Harness {
        let store = Arc::new(MemoryStore::default());
        let gateway = Arc::new(RecordingGateway::default());
        let channel = ChannelId::new("@autoboard");
        let (armed_tx, _armed_rx) = unpin_armed_channel();
        let scheduler = UnpinScheduler::new(store.clone(), channel.clone(), armed_tx);
        let publisher = ChannelPublisher::new(
            gateway.clone(),
            channel.clone(),
            "https://t.me/myautoboard_bot/autoboard",
            scheduler,
            Arc::new(ManualClock::new(T0)),
        );
        let synchronizer = StatusSynchronizer::new(
            store.clone(),
            gateway.clone(),
            channel,
            publisher.keyboard().clone(),
        );
        let engine = AdEngine::new(store.clone(), Arc::new(media), publisher, synchronizer);
        Harness {
            store,
            gateway,
            engine,
        }
    }

    fn harness() -> Harness {
        harness_with_media(StubMediaResolver::default())
    }

    fn submission(tariff: &str) -> AdSubmission {
        AdSubmission {
            user_id: 42,
            user_name: Some("Ivan".to_string()),
            brand: "BMW".to_string(),
            model: "X5".to_string(),
            modification: None,
            year: "2020".to_string(),
            engine: None,
            power: None,
            mileage: "160".to_string(),
            drivetrain: None,
            description: String::new(),
            city: Some("Москва".to_string()),
            price: "1500000".to_string(),
            phone: Some("+79991234567".to_string()),
            telegram: None,
            show_phone: true,
            show_telegram: false,
            photos: vec!["front.jpg".to_string(), "back.jpg".to_string()],
            tariff: tariff.to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_vip_with_photo() {
        let h = harness();
        let outcome = h.engine.publish(submission("vip")).await.unwrap();
        assert!(outcome.pinned);

        let ad = h.store.ad(outcome.ad_id).unwrap();
        assert_eq!(ad.status, AdStatus::Active);
        assert_eq!(ad.tariff, Tariff::Vip);
        assert_eq!(ad.channel_message_id, Some(outcome.message_id));
        assert_eq!(ad.channel_post_kind, Some(PostKind::Photo));
        assert_eq!(ad.published_at, Some(T0));

        let calls = h.gateway.calls();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            GatewayCall::SendPhoto { photo, caption, .. } => {
                assert_eq!(
                    photo,
                    &PhotoSource::Url("https://cdn.example.com/front.jpg".to_string())
                );
                assert!(caption.contains("VIP ОБЪЯВЛЕНИЕ"));
                assert!(caption.contains("1 500 000 ₽"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
        assert!(matches!(calls[1], GatewayCall::Pin { .. }));
        assert!(h.store.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_publish_premium_arms_one_unpin() {
        let h = harness();
        let outcome = h.engine.publish(submission("premium_3")).await.unwrap();
        assert!(outcome.pinned);
        assert_eq!(h.gateway.pins(), 1);

        let jobs = h.store.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].ad_id, outcome.ad_id);
        assert_eq!(jobs[0].due_at, T0 + time::Duration::days(3));
    }

    #[tokio::test]
    async fn test_publish_standard_never_pins() {
        let h = harness();
        let outcome = h.engine.publish(submission("standard")).await.unwrap();
        assert!(!outcome.pinned);
        assert_eq!(h.gateway.pins(), 0);
        assert!(h.store.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_pin_without_rights_still_publishes() {
        let h = harness();
        *h.gateway.pin_error.lock().unwrap() = Some(GatewayError::new(
            GatewayErrorKind::InsufficientPermissions,
            "Bad Request: not enough rights to pin a message",
        ));
        let outcome = h.engine.publish(submission("premium_3")).await.unwrap();
        assert!(!outcome.pinned);
        assert!(h.store.ad(outcome.ad_id).unwrap().channel_message_id.is_some());
        assert!(h.store.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_validation_precedes_any_call() {
        let h = harness();
        let mut bad = submission("vip");
        bad.brand = "  ".to_string();
        bad.price = String::new();

        let err = h.engine.publish(bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            err,
            PublishError::Validation(ValidationError::MissingFields(ref fields)) if fields == &["brand", "price"]
        ));
        assert!(h.gateway.calls().is_empty());
        assert!(h.store.users().is_empty());
        assert!(h.store.ads().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tariff_is_rejected() {
        let h = harness();
        let err = h.engine.publish(submission("gold")).await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::Validation(ValidationError::UnknownTariff(ref t)) if t == "gold"
        ));
        assert!(h.store.ads().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts_before_channel() {
        let h = harness();
        h.store.fail_ad_writes.store(true, Ordering::SeqCst);
        let err = h.engine.publish(submission("premium_1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(h.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_leaves_ad_active_then_retry() {
        let h = harness();
        *h.gateway.send_error.lock().unwrap() = Some(GatewayError::new(
            GatewayErrorKind::ChannelNotFound,
            "Bad Request: chat not found",
        ));
        let err = h.engine.publish(submission("premium_7")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChannelNotFound);
        assert_eq!(h.gateway.pins(), 0);

        let ad = h.store.ads().pop().unwrap();
        assert_eq!(ad.status, AdStatus::Active);
        assert_eq!(ad.channel_message_id, None);

        *h.gateway.send_error.lock().unwrap() = None;
        let outcome = h.engine.retry_publish(ad.id).await.unwrap();
        assert_eq!(outcome.ad_id, ad.id);
        assert!(outcome.pinned);
        assert_eq!(h.gateway.sends(), 2);
        assert_eq!(h.store.jobs().len(), 1);

        let err = h.engine.retry_publish(ad.id).await.unwrap_err();
        assert!(matches!(err, PublishError::NotPublishable { .. }));
        assert_eq!(h.gateway.sends(), 2);
    }

    #[tokio::test]
    async fn test_unstored_message_id_is_not_sent_twice() {
        let h = harness();
        h.store.fail_next_channel_post.store(true, Ordering::SeqCst);

        let outcome = h.engine.publish(submission("premium_3")).await.unwrap();
        assert!(outcome.pinned);
        assert_eq!(h.gateway.sends(), 1);
        assert_eq!(h.gateway.pins(), 1);
        assert_eq!(h.store.jobs().len(), 1);
        assert_eq!(h.store.ad(outcome.ad_id).unwrap().channel_message_id, None);

        let retried = h.engine.retry_publish(outcome.ad_id).await.unwrap();
        assert_eq!(retried, outcome);
        assert_eq!(h.gateway.sends(), 1);
        assert_eq!(h.gateway.pins(), 1);
        assert_eq!(h.store.jobs().len(), 1);
        let ad = h.store.ad(outcome.ad_id).unwrap();
        assert_eq!(ad.channel_message_id, Some(outcome.message_id));
        assert_eq!(ad.channel_post_kind, Some(PostKind::Photo));

        let err = h.engine.retry_publish(outcome.ad_id).await.unwrap_err();
        assert!(matches!(err, PublishError::NotPublishable { .. }));
        assert_eq!(h.gateway.sends(), 1);
    }

    #[tokio::test]
    async fn test_stored_post_wins_over_concurrent_send() {
        let h = harness();
        *h.gateway.send_error.lock().unwrap() =
            Some(GatewayError::new(GatewayErrorKind::Unknown, "timeout"));
        let _ = h.engine.publish(submission("premium_1")).await;
        let ad = h.store.ads().pop().unwrap();
        *h.gateway.send_error.lock().unwrap() = None;

        *h.store.preempt_channel_post.lock().unwrap() = Some(999);
        let err = h.engine.retry_publish(ad.id).await.unwrap_err();
        assert!(matches!(err, PublishError::NotPublishable { ad_id, .. } if ad_id == ad.id));
        assert_eq!(h.store.ad(ad.id).unwrap().channel_message_id, Some(999));
        assert_eq!(h.gateway.sends(), 2);
        assert_eq!(h.gateway.pins(), 0);
        assert!(h.store.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_retry_rejects_missing_and_closed_ads() {
        let h = harness();
        assert!(matches!(
            h.engine.retry_publish(999).await,
            Err(PublishError::NotFound(999))
        ));

        *h.gateway.send_error.lock().unwrap() =
            Some(GatewayError::new(GatewayErrorKind::Unknown, "timeout"));
        let _ = h.engine.publish(submission("standard")).await;
        let ad = h.store.ads().pop().unwrap();
        h.engine.set_status(ad.id, AdStatus::Deleted).await.unwrap();

        let err = h.engine.retry_publish(ad.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_unresolvable_photo_falls_back_to_text() {
        let h = harness_with_media(StubMediaResolver { fail: true });
        let outcome = h.engine.publish(submission("standard")).await.unwrap();
        assert!(matches!(h.gateway.calls()[0], GatewayCall::SendText { .. }));
        assert_eq!(
            h.store.ad(outcome.ad_id).unwrap().channel_post_kind,
            Some(PostKind::Text)
        );
    }

    #[tokio::test]
    async fn test_user_is_matched_by_telegram_id() {
        let h = harness();
        h.engine.publish(submission("standard")).await.unwrap();
        let mut second = submission("standard");
        second.user_name = Some("Ivan P.".to_string());
        h.engine.publish(second).await.unwrap();

        let users = h.store.users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].display_name.as_deref(), Some("Ivan P."));
        let ads = h.store.ads();
        assert_eq!(ads.len(), 2);
        assert!(ads.iter().all(|a| a.owner_id == users[0].id));
    }

    #[tokio::test]
    async fn test_set_status_through_engine() {
        let h = harness();
        let outcome = h.engine.publish(submission("standard")).await.unwrap();
        let change = h
            .engine
            .set_status(outcome.ad_id, AdStatus::Deleted)
            .await
            .unwrap();
        assert!(change.channel_synced);
        assert!(matches!(
            h.gateway.calls().last(),
            Some(GatewayCall::EditCaption { caption, .. }) if caption.contains("ПРОДАНО")
        ));
    }

    #[test]
    fn test_validate_submission() {
        assert_eq!(validate_submission(&submission(" vip ")).unwrap(), Tariff::Vip);

        let mut s = submission("standard");
        s.user_id = 0;
        assert_eq!(
            validate_submission(&s).unwrap_err(),
            ValidationError::InvalidUser(0)
        );

        let mut s = submission("standard");
        s.mileage = String::new();
        assert_eq!(
            validate_submission(&s).unwrap_err(),
            ValidationError::MissingFields(vec!["mileage"])
        );
    }
}
