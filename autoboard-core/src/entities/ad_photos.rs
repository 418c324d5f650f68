use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AdPhoto {
    pub id: i64,
    pub ad_id: i64,
    /// Display position, starting at 0. The first photo becomes the post image.
    pub order_index: i32,
    /// Storage path or URL as returned by the upload endpoint.
    pub storage_ref: String,
}

impl AdPhoto {
    /// Insert the photos of a freshly created ad inside its transaction.
    ///
    /// Order indices follow the order of `refs`.
    pub async fn insert_many_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        ad_id: i64,
        refs: &[String],
    ) -> Result<Vec<AdPhoto>, sqlx::Error> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder =
            sqlx::QueryBuilder::new("INSERT INTO ad_photos (ad_id, order_index, storage_ref) ");
        query_builder.push_values(refs.iter().cloned().enumerate(), |mut b, (index, storage_ref)| {
            b.push_bind(ad_id)
                .push_bind(index as i32)
                .push_bind(storage_ref);
        });
        query_builder.push(" RETURNING id, ad_id, order_index, storage_ref");

        let mut photos: Vec<AdPhoto> = query_builder
            .build_query_as::<AdPhoto>()
            .fetch_all(&mut **tx)
            .await?;
        photos.sort_by_key(|p| p.order_index);
        Ok(photos)
    }
}

#[derive(Debug, Clone)]
/// Get the photos of an ad ordered by their display position.
pub struct GetAdPhotos {
    pub ad_id: i64,
}

impl Processor<GetAdPhotos> for DatabaseProcessor {
    type Output = Vec<AdPhoto>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetAdPhotos")]
    async fn process(&self, query: GetAdPhotos) -> Result<Vec<AdPhoto>, sqlx::Error> {
        let photos = sqlx::query_as::<_, AdPhoto>(
            r#"
            SELECT id, ad_id, order_index, storage_ref
            FROM ad_photos
            WHERE ad_id = $1
            ORDER BY order_index ASC
            "#,
        )
        .bind(query.ad_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }
}
