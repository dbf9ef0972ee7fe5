//! Worker integration tests.
//!
//! Redis-only tests exercise the retry controller and the AI concurrency
//! bound. The end-to-end pipeline tests additionally need S3 credentials,
//! ffmpeg on PATH and a small fixture video named by `SUBGEN_TEST_VIDEO`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use subgen_coord::keys::{JOBS_PROCESSING, QUEUE_DLQ, QUEUE_LOW};
use subgen_coord::{CoordStore, DistributedSemaphore, JobStateWriter};
use subgen_models::{Job, JobId, JobStatus, Priority, Segment};
use subgen_storage::BlobClient;
use subgen_transcribe::{MockTranscriber, Transcriber};
use subgen_worker::{JobPipeline, RetryController, WorkerError};
use uuid::Uuid;

fn store() -> CoordStore {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    CoordStore::new(&url).expect("Failed to create store")
}

/// Pop entries from a queue until `job_id` shows up or the deadline passes.
async fn drain_until(store: &CoordStore, queue: &str, job_id: &JobId, deadline: Duration) -> bool {
    let started = Instant::now();
    while started.elapsed() < deadline {
        match store
            .list_blocking_pop_right(&[queue], Duration::from_secs(1))
            .await
            .expect("pop")
        {
            Some((_, value)) if value == job_id.as_str() => return true,
            Some(_) => continue,
            None => continue,
        }
    }
    false
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn failed_attempt_requeues_to_low_queue_after_backoff() {
    let store = store();
    let state = JobStateWriter::new(store.clone());
    let retry = RetryController::new(
        store.clone(),
        state.clone(),
        3,
        Duration::from_millis(50),
    );

    let job = Job::new("aa11-v.mp4", Priority::High);
    state.create(&job).await.expect("create");

    let failure = WorkerError::EmptyTranscript;
    retry
        .handle_failure(&job.id, &failure)
        .await
        .expect("handle_failure");

    let loaded = state.load(&job.id).await.expect("load").expect("present");
    assert_eq!(loaded.status, JobStatus::QueuedRetry);
    assert_eq!(loaded.retry_count, 1);
    assert_eq!(
        loaded.error.as_deref(),
        Some("Transcription service returned no segments.")
    );

    // The requeue lands on the low-priority queue after the delay, even
    // though the job was submitted as high priority.
    assert!(
        drain_until(&store, QUEUE_LOW, &job.id, Duration::from_secs(5)).await,
        "job never reappeared on queue:low"
    );
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn exhausted_job_is_dead_lettered() {
    let store = store();
    let state = JobStateWriter::new(store.clone());
    let retry = RetryController::new(
        store.clone(),
        state.clone(),
        3,
        Duration::from_millis(50),
    );

    let mut job = Job::new("bb22-v.mp4", Priority::Low);
    job.retry_count = 3;
    state.create(&job).await.expect("create");

    retry
        .handle_failure(&job.id, &WorkerError::EmptyTranscript)
        .await
        .expect("handle_failure");

    let loaded = state.load(&job.id).await.expect("load").expect("present");
    assert_eq!(loaded.status, JobStatus::FailedDlq);
    assert_eq!(loaded.retry_count, 4);
    assert!(loaded.error.is_some());

    assert!(
        drain_until(&store, QUEUE_DLQ, &job.id, Duration::from_secs(3)).await,
        "job never reached the DLQ"
    );
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn ai_semaphore_bounds_concurrent_transcriptions() {
    let store = store();
    let sem = DistributedSemaphore::new(
        store,
        format!("semaphore:test:{}", Uuid::new_v4()),
        1,
    );
    sem.init().await.expect("init");

    let mock = Arc::new(MockTranscriber::new().with_delay(Duration::from_millis(100)));

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let sem = sem.clone();
            let mock = Arc::clone(&mock);
            tokio::spawn(async move {
                sem.acquire().await.expect("acquire");
                let result = mock.transcribe("cc33-v.mp3").await;
                sem.release().await.expect("release");
                result
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("join").expect("transcribe");
    }

    assert_eq!(mock.calls(), 2);
    assert_eq!(
        mock.peak_in_flight(),
        1,
        "two transcriptions overlapped despite a capacity-1 AI semaphore"
    );
}

/// End-to-end pipeline scenarios. `SUBGEN_TEST_VIDEO` must point at a short
/// local video file with an audio track.
mod pipeline_e2e {
    use super::*;

    async fn build_pipeline(
        mock: Arc<MockTranscriber>,
        tmp_root: &std::path::Path,
    ) -> (CoordStore, JobStateWriter, BlobClient, JobPipeline) {
        let store = store();
        let state = JobStateWriter::new(store.clone());
        let blob = BlobClient::from_env().expect("blob client");
        let ai_semaphore = DistributedSemaphore::new(
            store.clone(),
            format!("semaphore:test:{}", Uuid::new_v4()),
            2,
        );
        ai_semaphore.init().await.expect("init");
        let retry = RetryController::new(
            store.clone(),
            state.clone(),
            3,
            Duration::from_millis(50),
        );
        let pipeline = JobPipeline::new(
            store.clone(),
            state.clone(),
            blob.clone(),
            mock,
            ai_semaphore,
            retry,
            tmp_root.to_path_buf(),
        );
        (store, state, blob, pipeline)
    }

    #[tokio::test]
    #[ignore = "requires Redis, S3 and ffmpeg"]
    async fn happy_path_produces_subtitles() {
        let fixture = std::env::var("SUBGEN_TEST_VIDEO").expect("SUBGEN_TEST_VIDEO not set");
        let scratch_root = tempfile::tempdir().expect("tempdir");

        let mock = Arc::new(MockTranscriber::new());
        mock.push_segments(vec![Segment::new("hi", 0, 1000)]);
        let (store, state, blob, pipeline) = build_pipeline(Arc::clone(&mock), scratch_root.path()).await;

        let video_key = format!("{}-fixture.mp4", Uuid::new_v4());
        blob.put_file(&fixture, &video_key, "video/mp4")
            .await
            .expect("upload fixture");

        let job = Job::new(video_key.clone(), Priority::High);
        state.create(&job).await.expect("create");

        pipeline.execute(&job.id).await;

        let stem = video_key.strip_suffix(".mp4").unwrap();
        let loaded = state.load(&job.id).await.expect("load").expect("present");
        assert_eq!(loaded.status, JobStatus::Completed);
        assert_eq!(loaded.audio_url.as_deref(), Some(format!("{stem}.mp3").as_str()));
        assert_eq!(loaded.subtitle_url.as_deref(), Some(format!("{stem}.srt").as_str()));
        assert_eq!(loaded.retry_count, 0);

        // The finished SRT body is exactly the one segment.
        let srt_path = scratch_root.path().join("downloaded.srt");
        blob.get_to_file(&format!("{stem}.srt"), &srt_path)
            .await
            .expect("download srt");
        let srt = tokio::fs::read_to_string(&srt_path).await.expect("read srt");
        assert_eq!(srt, "1\n00:00:00.000 --> 00:00:01.000\nhi\n\n");

        // Per-attempt resources were released.
        assert!(
            !store
                .set_contains(JOBS_PROCESSING, job.id.as_str())
                .await
                .expect("sismember")
        );
        assert!(!scratch_root.path().join(job.id.as_str()).exists());
    }

    #[tokio::test]
    #[ignore = "requires Redis, S3 and ffmpeg"]
    async fn mid_pipeline_failure_cleans_up_and_requeues() {
        let fixture = std::env::var("SUBGEN_TEST_VIDEO").expect("SUBGEN_TEST_VIDEO not set");
        let scratch_root = tempfile::tempdir().expect("tempdir");

        let mock = Arc::new(MockTranscriber::new());
        mock.push_failure("simulated provider outage");
        let (store, state, blob, pipeline) = build_pipeline(Arc::clone(&mock), scratch_root.path()).await;

        let video_key = format!("{}-fixture.mp4", Uuid::new_v4());
        blob.put_file(&fixture, &video_key, "video/mp4")
            .await
            .expect("upload fixture");

        let job = Job::new(video_key, Priority::Low);
        state.create(&job).await.expect("create");

        pipeline.execute(&job.id).await;

        let loaded = state.load(&job.id).await.expect("load").expect("present");
        assert_eq!(loaded.status, JobStatus::QueuedRetry);
        assert_eq!(loaded.retry_count, 1);
        assert!(loaded
            .error
            .as_deref()
            .unwrap()
            .contains("simulated provider outage"));

        // Cleanup ran despite the failure.
        assert!(
            !store
                .set_contains(JOBS_PROCESSING, job.id.as_str())
                .await
                .expect("sismember")
        );
        assert!(!scratch_root.path().join(job.id.as_str()).exists());

        assert!(
            drain_until(&store, QUEUE_LOW, &job.id, Duration::from_secs(5)).await,
            "job never reappeared on queue:low"
        );
    }
}
