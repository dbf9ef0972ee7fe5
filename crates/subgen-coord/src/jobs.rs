//! Per-job state updates.
//!
//! All worker-side mutations of a job record go through this type so state
//! transitions are observable in one place. Updates are per-field and
//! non-transactional; readers must tolerate intermediate states.

use subgen_models::{Job, JobId, JobStatus};
use tracing::debug;

use crate::error::{CoordError, CoordResult};
use crate::keys::job_key;
use crate::store::CoordStore;

#[derive(Clone)]
pub struct JobStateWriter {
    store: CoordStore,
}

impl JobStateWriter {
    pub fn new(store: CoordStore) -> Self {
        Self { store }
    }

    /// Write a full job record. Used by the submission boundary and tests.
    pub async fn create(&self, job: &Job) -> CoordResult<()> {
        self.store
            .hash_set_fields(&job_key(&job.id), &job.to_fields())
            .await
    }

    /// Load a full job record, if present.
    pub async fn load(&self, id: &JobId) -> CoordResult<Option<Job>> {
        let fields = self.store.hash_get_all(&job_key(id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(Job::from_fields(&fields)?))
    }

    /// Transition the job to a new status.
    pub async fn set_status(&self, id: &JobId, status: JobStatus) -> CoordResult<()> {
        debug!(job_id = %id, status = %status, "Job status transition");
        self.store
            .hash_set_fields(&job_key(id), &[("status", status.as_str().to_string())])
            .await
    }

    /// Record a failure outcome: the retry or DLQ status plus the message.
    pub async fn record_failure(
        &self,
        id: &JobId,
        status: JobStatus,
        error: &str,
    ) -> CoordResult<()> {
        debug!(job_id = %id, status = %status, error = %error, "Job failure recorded");
        self.store
            .hash_set_fields(
                &job_key(id),
                &[
                    ("status", status.as_str().to_string()),
                    ("error", error.to_string()),
                ],
            )
            .await
    }

    /// Record the blob key of the extracted audio.
    pub async fn set_audio_url(&self, id: &JobId, key: &str) -> CoordResult<()> {
        self.store
            .hash_set_fields(&job_key(id), &[("audioUrl", key.to_string())])
            .await
    }

    /// Record the blob key of the finished subtitle document.
    pub async fn set_subtitle_url(&self, id: &JobId, key: &str) -> CoordResult<()> {
        self.store
            .hash_set_fields(&job_key(id), &[("subtitleUrl", key.to_string())])
            .await
    }

    /// Read the input video blob key.
    pub async fn video_url(&self, id: &JobId) -> CoordResult<Option<String>> {
        self.store.hash_get_field(&job_key(id), "videoUrl").await
    }

    /// Read the current status.
    pub async fn status(&self, id: &JobId) -> CoordResult<Option<JobStatus>> {
        match self.store.hash_get_field(&job_key(id), "status").await? {
            Some(raw) => Ok(Some(raw.parse().map_err(CoordError::Model)?)),
            None => Ok(None),
        }
    }

    /// Atomically bump the retry counter, returning the new value.
    pub async fn increment_retry_count(&self, id: &JobId) -> CoordResult<i64> {
        self.store.hash_incr(&job_key(id), "retryCount", 1).await
    }
}
