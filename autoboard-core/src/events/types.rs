//! Event type definitions.
//!
//! Events carry identifiers and timestamps only; the receiver re-reads
//! current state from the database.

/// Emitted after an unpin job row has been committed.
///
/// Wakes the sweeper so it can shorten its sleep when the new job is due
/// before whatever it was waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpinArmed {
    pub job_id: i64,
    pub ad_id: i64,
    pub due_at: time::PrimitiveDateTime,
}
