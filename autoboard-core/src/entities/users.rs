use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub display_name: Option<String>,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone)]
/// Find a user by Telegram id, creating the row on first publish.
///
/// Runs as a single upsert so concurrent first publishes by the same user
/// resolve to one row. A provided display name replaces the stored one.
pub struct FindOrCreateUser {
    pub telegram_id: i64,
    pub display_name: Option<String>,
}

impl Processor<FindOrCreateUser> for DatabaseProcessor {
    type Output = User;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:FindOrCreateUser")]
    async fn process(&self, query: FindOrCreateUser) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (telegram_id, display_name)
            VALUES ($1, $2)
            ON CONFLICT (telegram_id) DO UPDATE
            SET display_name = COALESCE(EXCLUDED.display_name, users.display_name),
                updated_at = (NOW() AT TIME ZONE 'utc')
            RETURNING id, telegram_id, display_name, created_at, updated_at
            "#,
        )
        .bind(query.telegram_id)
        .bind(query.display_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}
