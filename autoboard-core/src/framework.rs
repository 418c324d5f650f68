use sqlx::PgPool;

/// Executes the typed SQL requests in [`crate::entities`].
///
/// Every query is a request struct with a
/// `kanau::processor::Processor` implementation on this type.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
