//! Failure classification, backoff and dead-lettering.

use std::time::Duration;

use subgen_coord::keys::{QUEUE_DLQ, QUEUE_LOW};
use subgen_coord::{CoordStore, JobStateWriter};
use subgen_models::{JobId, JobStatus};
use tracing::{error, info, warn};

use crate::error::{WorkerError, WorkerResult};

/// Decides the fate of a failed job attempt.
///
/// Every failure bumps the retry counter atomically. Within budget the job
/// is re-queued onto `queue:low` after an exponential delay; retries always
/// yield to fresh submissions. Beyond budget the job is dead-lettered.
#[derive(Clone)]
pub struct RetryController {
    store: CoordStore,
    state: JobStateWriter,
    max_retries: u32,
    initial_backoff: Duration,
}

impl RetryController {
    pub fn new(
        store: CoordStore,
        state: JobStateWriter,
        max_retries: u32,
        initial_backoff: Duration,
    ) -> Self {
        Self {
            store,
            state,
            max_retries,
            initial_backoff,
        }
    }

    /// Delay before the nth retry: `2^(n-1) * initial_backoff`.
    pub fn backoff_for(&self, retry_count: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry_count.saturating_sub(1)))
    }

    /// Record a failed attempt and either schedule a retry or dead-letter.
    ///
    /// The job leaves its `processing:*` status before this returns. The
    /// delayed requeue runs on an in-process timer; if the worker dies during
    /// the wait the job stays parked in `queued:retry` until an operator
    /// intervenes.
    pub async fn handle_failure(&self, job_id: &JobId, failure: &WorkerError) -> WorkerResult<()> {
        let retry_count = self.state.increment_retry_count(job_id).await? as u32;
        let message = failure.to_string();

        if retry_count <= self.max_retries {
            self.state
                .record_failure(job_id, JobStatus::QueuedRetry, &message)
                .await?;

            let delay = self.backoff_for(retry_count);
            info!(
                job_id = %job_id,
                retry = retry_count,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %message,
                "Job failed, scheduling retry"
            );

            let store = self.store.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = store.list_push_left(QUEUE_LOW, job_id.as_str()).await {
                    error!(job_id = %job_id, error = %e, "Failed to requeue job after backoff");
                }
            });
        } else {
            self.state
                .record_failure(job_id, JobStatus::FailedDlq, &message)
                .await?;
            self.store.list_push_left(QUEUE_DLQ, job_id.as_str()).await?;
            warn!(
                job_id = %job_id,
                retries = retry_count - 1,
                error = %message,
                "Job exhausted retries, moved to DLQ"
            );
        }

        Ok(())
    }
}
