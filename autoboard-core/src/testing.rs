//! In-memory doubles shared by the unit tests.

use crate::entities::ad_photos::AdPhoto;
use crate::entities::ads::{Ad, AdInsert};
use crate::entities::unpin_jobs::{UnpinJob, UnpinJobInsert};
use crate::entities::users::User;
use crate::entities::{AdStatus, PostKind, Tariff};
use crate::errors::GatewayError;
use crate::media::{MediaError, MediaResolver};
use crate::store::{AdStore, UnpinJobStore};
use crate::telegram::{ChannelId, InlineKeyboard, MessageId, MessagingGateway, PhotoSource};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use time::PrimitiveDateTime;
use time::macros::datetime;

pub const T0: PrimitiveDateTime = datetime!(2025-03-01 12:00);

pub fn sample_ad(tariff: Tariff) -> Ad {
    Ad {
        id: 1,
        owner_id: 1,
        brand: "BMW".to_string(),
        model: "X5".to_string(),
        modification: None,
        year: "2020".to_string(),
        engine: None,
        power: None,
        mileage: "160".to_string(),
        drivetrain: None,
        description: String::new(),
        city: None,
        price: "1500000".to_string(),
        phone: Some("+79991234567".to_string()),
        telegram: Some("bmw_seller".to_string()),
        show_phone: true,
        show_telegram: true,
        tariff,
        status: AdStatus::Active,
        channel_message_id: None,
        channel_post_kind: None,
        created_at: T0,
        updated_at: T0,
        published_at: None,
    }
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: Vec<User>,
    ads: Vec<Ad>,
    photos: Vec<AdPhoto>,
    jobs: Vec<UnpinJob>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Implements both store traits over plain vectors.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    /// Every `AdStore` write fails with a pool timeout.
    pub fail_ad_writes: AtomicBool,
    /// `insert_job` fails with a pool timeout.
    pub fail_job_inserts: AtomicBool,
    /// The next `set_channel_post` fails with a pool timeout.
    pub fail_next_channel_post: AtomicBool,
    /// The next `set_channel_post` finds this message id already stored, as
    /// if a concurrent publication had won the write.
    pub preempt_channel_post: Mutex<Option<MessageId>>,
}

impl MemoryStore {
    pub fn ad(&self, ad_id: i64) -> Option<Ad> {
        self.state
            .lock()
            .unwrap()
            .ads
            .iter()
            .find(|a| a.id == ad_id)
            .cloned()
    }

    pub fn ads(&self) -> Vec<Ad> {
        self.state.lock().unwrap().ads.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.state.lock().unwrap().users.clone()
    }

    pub fn jobs(&self) -> Vec<UnpinJob> {
        self.state.lock().unwrap().jobs.clone()
    }

    /// Seed an ad directly, bypassing validation.
    pub fn put_ad(&self, mut ad: Ad) -> Ad {
        let mut state = self.state.lock().unwrap();
        ad.id = state.next_id();
        state.ads.push(ad.clone());
        ad
    }

    fn check_ad_writes(&self) -> Result<(), sqlx::Error> {
        if self.fail_ad_writes.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

#[async_trait]
impl AdStore for MemoryStore {
    async fn find_or_create_user(
        &self,
        telegram_id: i64,
        display_name: Option<String>,
    ) -> Result<User, sqlx::Error> {
        self.check_ad_writes()?;
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.telegram_id == telegram_id) {
            if display_name.is_some() {
                user.display_name = display_name;
            }
            return Ok(user.clone());
        }
        let user = User {
            id: state.next_id(),
            telegram_id,
            display_name,
            created_at: T0,
            updated_at: T0,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn insert_ad(
        &self,
        ad: AdInsert,
        photos: Vec<String>,
    ) -> Result<(Ad, Vec<AdPhoto>), sqlx::Error> {
        self.check_ad_writes()?;
        let mut state = self.state.lock().unwrap();
        let row = Ad {
            id: state.next_id(),
            owner_id: ad.owner_id,
            brand: ad.brand,
            model: ad.model,
            modification: ad.modification,
            year: ad.year,
            engine: ad.engine,
            power: ad.power,
            mileage: ad.mileage,
            drivetrain: ad.drivetrain,
            description: ad.description,
            city: ad.city,
            price: ad.price,
            phone: ad.phone,
            telegram: ad.telegram,
            show_phone: ad.show_phone,
            show_telegram: ad.show_telegram,
            tariff: ad.tariff,
            status: AdStatus::Active,
            channel_message_id: None,
            channel_post_kind: None,
            created_at: T0,
            updated_at: T0,
            published_at: None,
        };
        let mut inserted = Vec::with_capacity(photos.len());
        for (index, storage_ref) in photos.into_iter().enumerate() {
            let photo = AdPhoto {
                id: state.next_id(),
                ad_id: row.id,
                order_index: index as i32,
                storage_ref,
            };
            inserted.push(photo.clone());
            state.photos.push(photo);
        }
        state.ads.push(row.clone());
        Ok((row, inserted))
    }

    async fn get_ad(&self, ad_id: i64) -> Result<Option<Ad>, sqlx::Error> {
        Ok(self.ad(ad_id))
    }

    async fn get_photos(&self, ad_id: i64) -> Result<Vec<AdPhoto>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        let mut photos: Vec<AdPhoto> = state
            .photos
            .iter()
            .filter(|p| p.ad_id == ad_id)
            .cloned()
            .collect();
        photos.sort_by_key(|p| p.order_index);
        Ok(photos)
    }

    async fn set_channel_post(
        &self,
        ad_id: i64,
        message_id: i64,
        kind: PostKind,
        published_at: PrimitiveDateTime,
    ) -> Result<bool, sqlx::Error> {
        self.check_ad_writes()?;
        if self.fail_next_channel_post.swap(false, Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let preempted = self.preempt_channel_post.lock().unwrap().take();
        let mut state = self.state.lock().unwrap();
        if let Some(winner) = preempted {
            if let Some(ad) = state.ads.iter_mut().find(|a| a.id == ad_id) {
                ad.channel_message_id = Some(winner);
            }
        }
        match state
            .ads
            .iter_mut()
            .find(|a| a.id == ad_id && a.channel_message_id.is_none())
        {
            Some(ad) => {
                ad.channel_message_id = Some(message_id);
                ad.channel_post_kind = Some(kind);
                ad.published_at = Some(published_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_status(&self, ad_id: i64, status: AdStatus) -> Result<bool, sqlx::Error> {
        self.check_ad_writes()?;
        let mut state = self.state.lock().unwrap();
        match state
            .ads
            .iter_mut()
            .find(|a| a.id == ad_id && a.status == AdStatus::Active)
        {
            Some(ad) => {
                ad.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl UnpinJobStore for MemoryStore {
    async fn insert_job(&self, job: UnpinJobInsert) -> Result<UnpinJob, sqlx::Error> {
        if self.fail_job_inserts.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut state = self.state.lock().unwrap();
        let row = UnpinJob {
            id: state.next_id(),
            ad_id: job.ad_id,
            channel_id: job.channel_id,
            message_id: job.message_id,
            due_at: job.due_at,
            fired_at: None,
            attempts: 0,
            created_at: T0,
        };
        state.jobs.push(row.clone());
        Ok(row)
    }

    async fn due_jobs(
        &self,
        now: PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<UnpinJob>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        let mut due: Vec<UnpinJob> = state
            .jobs
            .iter()
            .filter(|j| j.fired_at.is_none() && j.due_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|j| j.due_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn next_due_at(&self) -> Result<Option<PrimitiveDateTime>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .jobs
            .iter()
            .filter(|j| j.fired_at.is_none())
            .map(|j| j.due_at)
            .min())
    }

    async fn claim(&self, job_id: i64, now: PrimitiveDateTime) -> Result<bool, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        match state
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.fired_at.is_none())
        {
            Some(job) => {
                job.fired_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rearm(
        &self,
        job_id: i64,
        due_at: PrimitiveDateTime,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        match state
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.fired_at.is_some())
        {
            Some(job) => {
                job.fired_at = None;
                job.due_at = due_at;
                job.attempts += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    SendPhoto {
        channel: ChannelId,
        photo: PhotoSource,
        caption: String,
    },
    SendText {
        channel: ChannelId,
        body: String,
    },
    Pin {
        channel: ChannelId,
        message_id: MessageId,
    },
    Unpin {
        channel: ChannelId,
        message_id: MessageId,
    },
    EditText {
        message_id: MessageId,
        body: String,
    },
    EditCaption {
        message_id: MessageId,
        caption: String,
    },
}

/// Records every call; each operation can be told to fail.
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    next_message_id: AtomicI64,
    pub send_error: Mutex<Option<GatewayError>>,
    pub pin_error: Mutex<Option<GatewayError>>,
    pub unpin_error: Mutex<Option<GatewayError>>,
    pub edit_error: Mutex<Option<GatewayError>>,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(100),
            send_error: Mutex::new(None),
            pin_error: Mutex::new(None),
            unpin_error: Mutex::new(None),
            edit_error: Mutex::new(None),
        }
    }
}

impl RecordingGateway {
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pins(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::Pin { .. }))
    }

    pub fn unpins(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::Unpin { .. }))
    }

    pub fn sends(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::SendPhoto { .. } | GatewayCall::SendText { .. }))
    }

    fn count(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn outcome(slot: &Mutex<Option<GatewayError>>) -> Result<(), GatewayError> {
        match slot.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_photo(
        &self,
        channel: &ChannelId,
        photo: PhotoSource,
        caption: &str,
        _markup: &InlineKeyboard,
    ) -> Result<MessageId, GatewayError> {
        self.record(GatewayCall::SendPhoto {
            channel: channel.clone(),
            photo,
            caption: caption.to_string(),
        });
        Self::outcome(&self.send_error)?;
        Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn send_text(
        &self,
        channel: &ChannelId,
        body: &str,
        _markup: &InlineKeyboard,
    ) -> Result<MessageId, GatewayError> {
        self.record(GatewayCall::SendText {
            channel: channel.clone(),
            body: body.to_string(),
        });
        Self::outcome(&self.send_error)?;
        Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn pin(&self, channel: &ChannelId, message_id: MessageId) -> Result<(), GatewayError> {
        self.record(GatewayCall::Pin {
            channel: channel.clone(),
            message_id,
        });
        Self::outcome(&self.pin_error)
    }

    async fn unpin(&self, channel: &ChannelId, message_id: MessageId) -> Result<(), GatewayError> {
        self.record(GatewayCall::Unpin {
            channel: channel.clone(),
            message_id,
        });
        Self::outcome(&self.unpin_error)
    }

    async fn edit_text(
        &self,
        _channel: &ChannelId,
        message_id: MessageId,
        body: &str,
        _markup: &InlineKeyboard,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::EditText {
            message_id,
            body: body.to_string(),
        });
        Self::outcome(&self.edit_error)
    }

    async fn edit_caption(
        &self,
        _channel: &ChannelId,
        message_id: MessageId,
        caption: &str,
        _markup: &InlineKeyboard,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::EditCaption {
            message_id,
            caption: caption.to_string(),
        });
        Self::outcome(&self.edit_error)
    }
}

/// Resolves every reference to a URL, or fails every time.
#[derive(Default)]
pub struct StubMediaResolver {
    pub fail: bool,
}

#[async_trait]
impl MediaResolver for StubMediaResolver {
    async fn resolve(&self, reference: &str) -> Result<Option<PhotoSource>, MediaError> {
        if self.fail {
            return Err(MediaError::OutsideRoot(reference.to_string()));
        }
        Ok(Some(PhotoSource::Url(format!(
            "https://cdn.example.com/{reference}"
        ))))
    }
}
