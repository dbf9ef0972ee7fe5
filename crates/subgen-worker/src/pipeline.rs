//! Per-job pipeline execution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use subgen_coord::keys::JOBS_PROCESSING;
use subgen_coord::{CoordStore, DistributedSemaphore, JobStateWriter};
use subgen_models::{format_srt, JobId, JobStatus};
use subgen_storage::BlobClient;
use subgen_transcribe::Transcriber;
use tracing::{error, info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::retry::RetryController;

/// Drives one job through download, extraction, transcription and upload.
///
/// The pipeline owns the job's scratch directory and its membership in
/// `jobs:processing`; both are released unconditionally when an attempt
/// ends, whatever the outcome. Artifact keys are pure functions of the input
/// video key, so a retried attempt overwrites its predecessor's blobs.
pub struct JobPipeline {
    store: CoordStore,
    state: JobStateWriter,
    blob: BlobClient,
    transcriber: Arc<dyn Transcriber>,
    ai_semaphore: DistributedSemaphore,
    retry: RetryController,
    tmp_root: PathBuf,
}

impl JobPipeline {
    pub fn new(
        store: CoordStore,
        state: JobStateWriter,
        blob: BlobClient,
        transcriber: Arc<dyn Transcriber>,
        ai_semaphore: DistributedSemaphore,
        retry: RetryController,
        tmp_root: PathBuf,
    ) -> Self {
        Self {
            store,
            state,
            blob,
            transcriber,
            ai_semaphore,
            retry,
            tmp_root,
        }
    }

    /// Execute one attempt of the given job.
    ///
    /// Failures are fully handled here: the job ends the attempt in
    /// `completed`, `queued:retry` or `failed:dlq`, never stuck in a
    /// `processing:*` state. The caller only supplies a worker slot.
    pub async fn execute(&self, job_id: &JobId) {
        info!(job_id = %job_id, "Pipeline attempt started");
        let scratch = self.tmp_root.join(job_id.as_str());

        match self.run_stages(job_id, &scratch).await {
            Ok(()) => {
                info!(job_id = %job_id, "Pipeline attempt completed");
            }
            Err(failure) => {
                error!(job_id = %job_id, error = %failure, "Pipeline attempt failed");
                if let Err(e) = self.retry.handle_failure(job_id, &failure).await {
                    error!(
                        job_id = %job_id,
                        error = %e,
                        "Failed to record job failure; job may be left in a processing state"
                    );
                }
            }
        }

        self.cleanup(job_id, &scratch).await;
    }

    async fn run_stages(&self, job_id: &JobId, scratch: &Path) -> WorkerResult<()> {
        self.store.set_add(JOBS_PROCESSING, job_id.as_str()).await?;
        tokio::fs::create_dir_all(scratch).await?;

        // Download the input video.
        self.state
            .set_status(job_id, JobStatus::DownloadingVideo)
            .await?;
        let video_key = self
            .state
            .video_url(job_id)
            .await?
            .ok_or(WorkerError::MissingJobField("videoUrl"))?;
        let video_path = scratch.join(basename(&video_key));
        self.blob.get_to_file(&video_key, &video_path).await?;

        // Extract the audio track.
        self.state
            .set_status(job_id, JobStatus::ExtractingAudio)
            .await?;
        let audio_key = format!("{}.mp3", stem(&video_key));
        let audio_path = scratch.join(basename(&audio_key));
        subgen_media::extract_audio(&video_path, &audio_path).await?;

        self.blob
            .put_file(&audio_path, &audio_key, "audio/mpeg")
            .await?;
        self.state.set_audio_url(job_id, &audio_key).await?;

        // Transcribe under an AI slot, held only for the duration of the call.
        self.ai_semaphore.acquire().await?;
        let transcribed = async {
            self.state
                .set_status(job_id, JobStatus::TranscribingAudio)
                .await?;
            Ok::<_, WorkerError>(self.transcriber.transcribe(&audio_key).await?)
        }
        .await;
        if let Err(e) = self.ai_semaphore.release().await {
            error!(job_id = %job_id, error = %e, "Failed to release AI slot");
        }
        let segments = transcribed?;

        if segments.is_empty() {
            return Err(WorkerError::EmptyTranscript);
        }

        // Format and upload the subtitle document.
        let srt = format_srt(&segments);
        let subtitle_key = format!("{}.srt", stem(&video_key));
        self.blob
            .put_bytes(srt.into_bytes(), &subtitle_key, "application/x-subrip")
            .await?;
        self.state.set_subtitle_url(job_id, &subtitle_key).await?;
        self.state.set_status(job_id, JobStatus::Completed).await?;

        info!(
            job_id = %job_id,
            subtitle_key = %subtitle_key,
            segments = segments.len(),
            "Subtitles uploaded"
        );
        Ok(())
    }

    /// Release per-attempt resources. Failures here are logged, never charged
    /// to the job.
    async fn cleanup(&self, job_id: &JobId, scratch: &Path) {
        if let Err(e) = self.store.set_remove(JOBS_PROCESSING, job_id.as_str()).await {
            warn!(job_id = %job_id, error = %e, "Failed to leave the processing set");
        }
        if let Err(e) = tokio::fs::remove_dir_all(scratch).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    job_id = %job_id,
                    scratch = %scratch.display(),
                    error = %e,
                    "Failed to delete scratch directory"
                );
            }
        }
    }
}

/// Final path component of a blob key.
fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Basename with its last extension removed. Artifact keys derive from this,
/// so they are stable across retries of the same job.
fn stem(key: &str) -> &str {
    let base = basename(key);
    base.rsplit_once('.').map(|(s, _)| s).unwrap_or(base)
}
