use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

/// A persisted, one-shot unpin of a channel message.
///
/// `fired_at` is set when the job is claimed for execution; a claimed job is
/// never picked up again unless a transient unpin failure re-arms it.
/// `attempts` counts those re-arms.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UnpinJob {
    pub id: i64,
    pub ad_id: i64,
    pub channel_id: String,
    pub message_id: i64,
    pub due_at: time::PrimitiveDateTime,
    pub fired_at: Option<time::PrimitiveDateTime>,
    pub attempts: i32,
    pub created_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpinJobInsert {
    pub ad_id: i64,
    pub channel_id: String,
    pub message_id: i64,
    pub due_at: time::PrimitiveDateTime,
}

impl Processor<UnpinJobInsert> for DatabaseProcessor {
    type Output = UnpinJob;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertUnpinJob")]
    async fn process(&self, insert: UnpinJobInsert) -> Result<UnpinJob, sqlx::Error> {
        let job = sqlx::query_as::<_, UnpinJob>(
            r#"
            INSERT INTO unpin_jobs (ad_id, channel_id, message_id, due_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ad_id, channel_id, message_id, due_at, fired_at, attempts, created_at
            "#,
        )
        .bind(insert.ad_id)
        .bind(insert.channel_id)
        .bind(insert.message_id)
        .bind(insert.due_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(job)
    }
}

#[derive(Debug, Clone)]
/// Get unfired jobs whose due time has passed, oldest first.
pub struct GetDueUnpinJobs {
    pub now: time::PrimitiveDateTime,
    pub limit: i64,
}

impl Processor<GetDueUnpinJobs> for DatabaseProcessor {
    type Output = Vec<UnpinJob>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetDueUnpinJobs")]
    async fn process(&self, query: GetDueUnpinJobs) -> Result<Vec<UnpinJob>, sqlx::Error> {
        let jobs = sqlx::query_as::<_, UnpinJob>(
            r#"
            SELECT id, ad_id, channel_id, message_id, due_at, fired_at, attempts, created_at
            FROM unpin_jobs
            WHERE fired_at IS NULL AND due_at <= $1
            ORDER BY due_at ASC
            LIMIT $2
            "#,
        )
        .bind(query.now)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }
}

#[derive(Debug, Clone)]
/// Earliest due time among unfired jobs.
pub struct GetNextUnpinDueAt;

impl Processor<GetNextUnpinDueAt> for DatabaseProcessor {
    type Output = Option<time::PrimitiveDateTime>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetNextUnpinDueAt")]
    async fn process(
        &self,
        _query: GetNextUnpinDueAt,
    ) -> Result<Option<time::PrimitiveDateTime>, sqlx::Error> {
        let due_at = sqlx::query_scalar::<_, Option<time::PrimitiveDateTime>>(
            "SELECT MIN(due_at) FROM unpin_jobs WHERE fired_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(due_at)
    }
}

#[derive(Debug, Clone)]
/// Claim a job for execution.
///
/// Returns true only for the single caller that flipped `fired_at`.
pub struct ClaimUnpinJob {
    pub job_id: i64,
    pub now: time::PrimitiveDateTime,
}

impl Processor<ClaimUnpinJob> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ClaimUnpinJob")]
    async fn process(&self, claim: ClaimUnpinJob) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE unpin_jobs
            SET fired_at = $2
            WHERE id = $1 AND fired_at IS NULL
            "#,
        )
        .bind(claim.job_id)
        .bind(claim.now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone)]
/// Release a claimed job and move it to a later due time.
///
/// Returns false if the job was not claimed.
pub struct RearmUnpinJob {
    pub job_id: i64,
    pub due_at: time::PrimitiveDateTime,
}

impl Processor<RearmUnpinJob> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:RearmUnpinJob")]
    async fn process(&self, rearm: RearmUnpinJob) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE unpin_jobs
            SET fired_at = NULL, due_at = $2, attempts = attempts + 1
            WHERE id = $1 AND fired_at IS NOT NULL
            "#,
        )
        .bind(rearm.job_id)
        .bind(rearm.due_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
