use crate::entities::ad_photos::AdPhoto;
use crate::entities::{AdStatus, PostKind, Tariff};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

const AD_COLUMNS: &str = r#"
    id, owner_id, brand, model, modification, year, engine, power, mileage,
    drivetrain, description, city, price, phone, telegram, show_phone,
    show_telegram, tariff, status, channel_message_id, channel_post_kind,
    created_at, updated_at, published_at
"#;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Ad {
    pub id: i64,
    pub owner_id: i64,
    pub brand: String,
    pub model: String,
    pub modification: Option<String>,
    pub year: String,
    pub engine: Option<String>,
    pub power: Option<String>,
    /// Thousands of kilometres.
    pub mileage: String,
    pub drivetrain: Option<String>,
    pub description: String,
    pub city: Option<String>,
    pub price: String,
    pub phone: Option<String>,
    pub telegram: Option<String>,
    pub show_phone: bool,
    pub show_telegram: bool,
    /// Resolved once at publish time.
    pub tariff: Tariff,
    pub status: AdStatus,
    pub channel_message_id: Option<i64>,
    pub channel_post_kind: Option<PostKind>,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
    pub published_at: Option<time::PrimitiveDateTime>,
}

/// Data for inserting a new ad. Status starts as `active`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdInsert {
    pub owner_id: i64,
    pub brand: String,
    pub model: String,
    pub modification: Option<String>,
    pub year: String,
    pub engine: Option<String>,
    pub power: Option<String>,
    pub mileage: String,
    pub drivetrain: Option<String>,
    pub description: String,
    pub city: Option<String>,
    pub price: String,
    pub phone: Option<String>,
    pub telegram: Option<String>,
    pub show_phone: bool,
    pub show_telegram: bool,
    pub tariff: Tariff,
}

#[derive(Debug, Clone)]
/// Insert an ad and its photos in one transaction.
pub struct InsertAdWithPhotos {
    pub ad: AdInsert,
    pub photos: Vec<String>,
}

impl Processor<InsertAdWithPhotos> for DatabaseProcessor {
    type Output = (Ad, Vec<AdPhoto>);
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertAdWithPhotos")]
    async fn process(&self, insert: InsertAdWithPhotos) -> Result<(Ad, Vec<AdPhoto>), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let ad = insert.ad;
        let sql = format!(
            r#"
            INSERT INTO ads (
                owner_id, brand, model, modification, year, engine, power, mileage,
                drivetrain, description, city, price, phone, telegram, show_phone,
                show_telegram, tariff
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {AD_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Ad>(&sql)
            .bind(ad.owner_id)
            .bind(ad.brand)
            .bind(ad.model)
            .bind(ad.modification)
            .bind(ad.year)
            .bind(ad.engine)
            .bind(ad.power)
            .bind(ad.mileage)
            .bind(ad.drivetrain)
            .bind(ad.description)
            .bind(ad.city)
            .bind(ad.price)
            .bind(ad.phone)
            .bind(ad.telegram)
            .bind(ad.show_phone)
            .bind(ad.show_telegram)
            .bind(ad.tariff)
            .fetch_one(&mut *tx)
            .await?;

        let photos = AdPhoto::insert_many_tx(&mut tx, row.id, &insert.photos).await?;

        tx.commit().await?;
        Ok((row, photos))
    }
}

#[derive(Debug, Clone)]
/// Get an ad by id.
pub struct GetAdById {
    pub ad_id: i64,
}

impl Processor<GetAdById> for DatabaseProcessor {
    type Output = Option<Ad>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetAdById")]
    async fn process(&self, query: GetAdById) -> Result<Option<Ad>, sqlx::Error> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE id = $1");
        let ad = sqlx::query_as::<_, Ad>(&sql)
            .bind(query.ad_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ad)
    }
}

#[derive(Debug, Clone)]
/// Record the channel message created for an ad.
///
/// Only succeeds while no message id is stored, so a message id is written
/// at most once. Returns false when the guard rejected the update.
pub struct SetAdChannelPost {
    pub ad_id: i64,
    pub message_id: i64,
    pub kind: PostKind,
    pub published_at: time::PrimitiveDateTime,
}

impl Processor<SetAdChannelPost> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:SetAdChannelPost")]
    async fn process(&self, update: SetAdChannelPost) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE ads
            SET channel_message_id = $2,
                channel_post_kind = $3,
                published_at = $4,
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1 AND channel_message_id IS NULL
            "#,
        )
        .bind(update.ad_id)
        .bind(update.message_id)
        .bind(update.kind)
        .bind(update.published_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone)]
/// Move an active ad to a terminal status.
///
/// Returns false when the ad was no longer active.
pub struct UpdateAdStatus {
    pub ad_id: i64,
    pub status: AdStatus,
}

impl Processor<UpdateAdStatus> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateAdStatus")]
    async fn process(&self, update: UpdateAdStatus) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE ads
            SET status = $2, updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(update.ad_id)
        .bind(update.status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
