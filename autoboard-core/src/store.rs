//! Persistence seams used by the engine.
//!
//! The engine only talks to storage through [`AdStore`] and
//! [`UnpinJobStore`]. [`DatabaseProcessor`] implements both by delegating
//! to the typed SQL requests in [`crate::entities`].

use crate::entities::ad_photos::{AdPhoto, GetAdPhotos};
use crate::entities::ads::{
    Ad, AdInsert, GetAdById, InsertAdWithPhotos, SetAdChannelPost, UpdateAdStatus,
};
use crate::entities::unpin_jobs::{
    ClaimUnpinJob, GetDueUnpinJobs, GetNextUnpinDueAt, RearmUnpinJob, UnpinJob, UnpinJobInsert,
};
use crate::entities::users::{FindOrCreateUser, User};
use crate::entities::{AdStatus, PostKind};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;

/// Storage of users, ads and their photos.
#[async_trait]
pub trait AdStore: Send + Sync {
    /// Atomic find-or-create by Telegram identity.
    async fn find_or_create_user(
        &self,
        telegram_id: i64,
        display_name: Option<String>,
    ) -> Result<User, sqlx::Error>;

    /// Create an active ad together with its ordered photos.
    async fn insert_ad(
        &self,
        ad: AdInsert,
        photos: Vec<String>,
    ) -> Result<(Ad, Vec<AdPhoto>), sqlx::Error>;

    async fn get_ad(&self, ad_id: i64) -> Result<Option<Ad>, sqlx::Error>;

    async fn get_photos(&self, ad_id: i64) -> Result<Vec<AdPhoto>, sqlx::Error>;

    /// Store the channel message of an ad. Returns false if one was already stored.
    async fn set_channel_post(
        &self,
        ad_id: i64,
        message_id: i64,
        kind: PostKind,
        published_at: time::PrimitiveDateTime,
    ) -> Result<bool, sqlx::Error>;

    /// Move an active ad to `status`. Returns false if the ad was not active.
    async fn update_status(&self, ad_id: i64, status: AdStatus) -> Result<bool, sqlx::Error>;
}

/// Storage of durable unpin jobs.
#[async_trait]
pub trait UnpinJobStore: Send + Sync {
    async fn insert_job(&self, job: UnpinJobInsert) -> Result<UnpinJob, sqlx::Error>;

    async fn due_jobs(
        &self,
        now: time::PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<UnpinJob>, sqlx::Error>;

    async fn next_due_at(&self) -> Result<Option<time::PrimitiveDateTime>, sqlx::Error>;

    /// Mark a job fired. Returns true only for the caller that claimed it.
    async fn claim(&self, job_id: i64, now: time::PrimitiveDateTime) -> Result<bool, sqlx::Error>;

    /// Release a claimed job, due again at `due_at`, and count the attempt.
    async fn rearm(
        &self,
        job_id: i64,
        due_at: time::PrimitiveDateTime,
    ) -> Result<bool, sqlx::Error>;
}

#[async_trait]
impl AdStore for DatabaseProcessor {
    async fn find_or_create_user(
        &self,
        telegram_id: i64,
        display_name: Option<String>,
    ) -> Result<User, sqlx::Error> {
        self.process(FindOrCreateUser {
            telegram_id,
            display_name,
        })
        .await
    }

    async fn insert_ad(
        &self,
        ad: AdInsert,
        photos: Vec<String>,
    ) -> Result<(Ad, Vec<AdPhoto>), sqlx::Error> {
        self.process(InsertAdWithPhotos { ad, photos }).await
    }

    async fn get_ad(&self, ad_id: i64) -> Result<Option<Ad>, sqlx::Error> {
        self.process(GetAdById { ad_id }).await
    }

    async fn get_photos(&self, ad_id: i64) -> Result<Vec<AdPhoto>, sqlx::Error> {
        self.process(GetAdPhotos { ad_id }).await
    }

    async fn set_channel_post(
        &self,
        ad_id: i64,
        message_id: i64,
        kind: PostKind,
        published_at: time::PrimitiveDateTime,
    ) -> Result<bool, sqlx::Error> {
        self.process(SetAdChannelPost {
            ad_id,
            message_id,
            kind,
            published_at,
        })
        .await
    }

    async fn update_status(&self, ad_id: i64, status: AdStatus) -> Result<bool, sqlx::Error> {
        self.process(UpdateAdStatus { ad_id, status }).await
    }
}

#[async_trait]
impl UnpinJobStore for DatabaseProcessor {
    async fn insert_job(&self, job: UnpinJobInsert) -> Result<UnpinJob, sqlx::Error> {
        self.process(job).await
    }

    async fn due_jobs(
        &self,
        now: time::PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<UnpinJob>, sqlx::Error> {
        self.process(GetDueUnpinJobs { now, limit }).await
    }

    async fn next_due_at(&self) -> Result<Option<time::PrimitiveDateTime>, sqlx::Error> {
        self.process(GetNextUnpinDueAt).await
    }

    async fn claim(&self, job_id: i64, now: time::PrimitiveDateTime) -> Result<bool, sqlx::Error> {
        self.process(ClaimUnpinJob { job_id, now }).await
    }

    async fn rearm(
        &self,
        job_id: i64,
        due_at: time::PrimitiveDateTime,
    ) -> Result<bool, sqlx::Error> {
        self.process(RearmUnpinJob { job_id, due_at }).await
    }
}
