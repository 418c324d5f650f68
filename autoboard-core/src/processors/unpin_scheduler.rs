//! Pin lifecycle: arming and firing scheduled unpins.
//!
//! [`UnpinScheduler`] is called on the request path right after a successful
//! pin. It persists an `unpin_jobs` row and nudges the sweeper; it never
//! waits for the unpin itself.
//!
//! [`UnpinSweeper`] is the background processor that fires due jobs:
//! - Sweeps once at startup, so jobs that came due while the process was
//!   down fire immediately
//! - Sleeps until the earliest due job, bounded by the sweep interval
//! - Wakes early on `UnpinArmed`
//! - Claims each job before calling unpin, so a job fires at most once even
//!   with several sweepers on the same database
//! - Re-arms a job with backoff when the unpin fails transiently; a message
//!   that is already gone or unpinned ends the job with a warning

use crate::entities::PinPolicy;
use crate::entities::unpin_jobs::{UnpinJob, UnpinJobInsert};
use crate::events::{UnpinArmed, UnpinArmedReceiver, UnpinArmedSender};
use crate::store::UnpinJobStore;
use crate::telegram::{ChannelId, MessageId, MessagingGateway};
use crate::utils::clock::Clock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Default upper bound on how long the sweeper sleeps between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);
/// Default number of jobs fired per sweep batch.
pub const DEFAULT_BATCH_SIZE: i64 = 50;
/// Unpin attempts before a job is given up.
pub const MAX_UNPIN_ATTEMPTS: i32 = 8;
/// Delay before the first retry of a failed unpin; doubles per attempt.
pub const UNPIN_RETRY_BASE: time::Duration = time::Duration::minutes(5);
/// Longest delay between two retries.
pub const UNPIN_RETRY_MAX: time::Duration = time::Duration::hours(6);

#[derive(Clone)]
pub struct UnpinScheduler {
    jobs: Arc<dyn UnpinJobStore>,
    channel: ChannelId,
    armed_tx: UnpinArmedSender,
}

impl UnpinScheduler {
    pub fn new(jobs: Arc<dyn UnpinJobStore>, channel: ChannelId, armed_tx: UnpinArmedSender) -> Self {
        Self {
            jobs,
            channel,
            armed_tx,
        }
    }

    /// Arm an unpin for a message pinned at `pinned_at`.
    ///
    /// Only fixed-duration policies produce a job; for the others this is a
    /// no-op returning `None`.
    pub async fn arm(
        &self,
        ad_id: i64,
        message_id: MessageId,
        pinned_at: time::PrimitiveDateTime,
        policy: PinPolicy,
    ) -> Result<Option<UnpinJob>, sqlx::Error> {
        let Some(after) = policy.unpin_after() else {
            return Ok(None);
        };

        let job = self
            .jobs
            .insert_job(UnpinJobInsert {
                ad_id,
                channel_id: self.channel.as_str().to_string(),
                message_id,
                due_at: pinned_at + after,
            })
            .await?;

        let event = UnpinArmed {
            job_id: job.id,
            ad_id,
            due_at: job.due_at,
        };
        if let Err(e) = self.armed_tx.try_send(event) {
            // The periodic sweep still picks the job up.
            debug!(job_id = job.id, error = %e, "UnpinArmed event not delivered");
        }

        info!(
            ad_id,
            message_id,
            job_id = job.id,
            due_at = %job.due_at,
            "Unpin armed"
        );
        Ok(Some(job))
    }
}

/// Background processor that fires due unpin jobs.
pub struct UnpinSweeper {
    jobs: Arc<dyn UnpinJobStore>,
    gateway: Arc<dyn MessagingGateway>,
    clock: Arc<dyn Clock>,
    interval: std::time::Duration,
    batch_size: i64,
}

impl UnpinSweeper {
    pub fn new(
        jobs: Arc<dyn UnpinJobStore>,
        gateway: Arc<dyn MessagingGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            jobs,
            gateway,
            clock,
            interval: DEFAULT_SWEEP_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_interval(mut self, interval: std::time::Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run the sweeper until shutdown is signaled.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>, mut armed_rx: UnpinArmedReceiver) {
        info!(interval = ?self.interval, "UnpinSweeper started");

        loop {
            match self.sweep().await {
                Ok(0) => {}
                Ok(fired) => info!(fired, "Unpin sweep fired jobs"),
                Err(e) => error!(error = %e, "Unpin sweep failed"),
            }

            let wait = self.next_wait().await;

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("UnpinSweeper received shutdown signal");
                        break;
                    }
                }

                Some(event) = armed_rx.recv() => {
                    debug!(job_id = event.job_id, ad_id = event.ad_id, due_at = %event.due_at, "Received UnpinArmed");
                }

                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("UnpinSweeper shutdown complete");
    }

    /// Fire every job due at the current clock time.
    ///
    /// Returns the number of jobs this call claimed. A transient unpin
    /// failure re-arms the job for a later sweep; any other failure is
    /// logged and the job stays fired.
    pub async fn sweep(&self) -> Result<u32, sqlx::Error> {
        let mut fired = 0;
        loop {
            let now = self.clock.now();
            let due = self.jobs.due_jobs(now, self.batch_size).await?;
            let batch_len = due.len();

            for job in due {
                if !self.jobs.claim(job.id, now).await? {
                    debug!(job_id = job.id, "Unpin job already claimed");
                    continue;
                }
                fired += 1;
                if let Some(retry_at) = self.fire(&job, now).await {
                    self.jobs.rearm(job.id, retry_at).await?;
                }
            }

            if (batch_len as i64) < self.batch_size {
                return Ok(fired);
            }
        }
    }

    /// Unpin the job's message. Returns the retry time if the job must be
    /// re-armed.
    async fn fire(
        &self,
        job: &UnpinJob,
        now: time::PrimitiveDateTime,
    ) -> Option<time::PrimitiveDateTime> {
        let channel = ChannelId::new(job.channel_id.clone());
        let e = match self.gateway.unpin(&channel, job.message_id).await {
            Ok(()) => {
                info!(
                    job_id = job.id,
                    ad_id = job.ad_id,
                    message_id = job.message_id,
                    "Channel post unpinned"
                );
                return None;
            }
            Err(e) => e,
        };

        let attempt = job.attempts + 1;
        if !e.is_transient() {
            warn!(
                job_id = job.id,
                ad_id = job.ad_id,
                message_id = job.message_id,
                kind = %e.kind,
                error = %e.detail,
                "Channel post not unpinned, message gone or already unpinned"
            );
            return None;
        }
        if attempt >= MAX_UNPIN_ATTEMPTS {
            error!(
                job_id = job.id,
                ad_id = job.ad_id,
                message_id = job.message_id,
                attempts = attempt,
                error = %e.detail,
                "Giving up on unpin, post stays pinned"
            );
            return None;
        }

        let retry_at = now + retry_delay(job.attempts);
        warn!(
            job_id = job.id,
            ad_id = job.ad_id,
            message_id = job.message_id,
            attempt,
            retry_at = %retry_at,
            error = %e.detail,
            "Unpin failed, will retry"
        );
        Some(retry_at)
    }

    async fn next_wait(&self) -> std::time::Duration {
        match self.jobs.next_due_at().await {
            Ok(Some(due_at)) => {
                let until = std::time::Duration::try_from(due_at - self.clock.now()).unwrap_or_default();
                until.min(self.interval)
            }
            Ok(None) => self.interval,
            Err(e) => {
                warn!(error = %e, "Failed to read next unpin due time");
                self.interval
            }
        }
    }
}

/// Backoff before the retry following `attempts` earlier failures.
fn retry_delay(attempts: i32) -> time::Duration {
    let factor = 1i32 << attempts.clamp(0, 16);
    (UNPIN_RETRY_BASE * factor).min(UNPIN_RETRY_MAX)
}
