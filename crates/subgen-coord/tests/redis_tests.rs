//! Redis coordination integration tests.

use std::time::Duration;

use subgen_coord::{CoordStore, DistributedSemaphore, JobStateWriter};
use subgen_models::{Job, JobStatus, Priority};
use uuid::Uuid;

fn store() -> CoordStore {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    CoordStore::new(&url).expect("Failed to create store")
}

fn test_key(prefix: &str) -> String {
    format!("{prefix}:test:{}", Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn hash_operations_round_trip() {
    let store = store();
    let key = test_key("hash");

    store
        .hash_set_fields(&key, &[("a", "1".to_string()), ("b", "two".to_string())])
        .await
        .expect("hset");

    assert_eq!(
        store.hash_get_field(&key, "b").await.expect("hget"),
        Some("two".to_string())
    );
    assert_eq!(store.hash_get_field(&key, "missing").await.expect("hget"), None);

    assert_eq!(store.hash_incr(&key, "a", 1).await.expect("hincr"), 2);
    assert_eq!(store.hash_incr(&key, "a", 1).await.expect("hincr"), 3);

    let all = store.hash_get_all(&key).await.expect("hgetall");
    assert_eq!(all.len(), 2);
    assert_eq!(all.get("a"), Some(&"3".to_string()));
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn blocking_pop_respects_key_order() {
    let store = store();
    let high = test_key("q.high");
    let low = test_key("q.low");

    store.list_push_left(&low, "low-1").await.expect("push");
    store.list_push_left(&high, "high-1").await.expect("push");
    store.list_push_left(&high, "high-2").await.expect("push");

    // The earlier key wins for as long as it is non-empty.
    let (from, value) = store
        .list_blocking_pop_right(&[&high, &low], Duration::from_secs(1))
        .await
        .expect("pop")
        .expect("value");
    assert_eq!(from, high);
    assert_eq!(value, "high-1");

    let (from, value) = store
        .list_blocking_pop_right(&[&high, &low], Duration::from_secs(1))
        .await
        .expect("pop")
        .expect("value");
    assert_eq!(from, high);
    assert_eq!(value, "high-2");

    let (from, value) = store
        .list_blocking_pop_right(&[&high, &low], Duration::from_secs(1))
        .await
        .expect("pop")
        .expect("value");
    assert_eq!(from, low);
    assert_eq!(value, "low-1");

    let none = store
        .list_blocking_pop_right(&[&high, &low], Duration::from_secs(1))
        .await
        .expect("pop");
    assert!(none.is_none());
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn push_right_jumps_the_line() {
    let store = store();
    let list = test_key("list");

    store.list_push_left(&list, "oldest").await.expect("push");
    store.list_push_left(&list, "newer").await.expect("push");
    // A right push lands at the consumption end, ahead of FIFO order.
    store.list_push_right(&list, "urgent").await.expect("push");

    let (_, value) = store
        .list_blocking_pop_right(&[&list], Duration::from_secs(1))
        .await
        .expect("pop")
        .expect("value");
    assert_eq!(value, "urgent");

    assert_eq!(store.list_len(&list).await.expect("llen"), 2);
    store.list_delete(&list).await.expect("del");
    assert_eq!(store.list_len(&list).await.expect("llen"), 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn set_membership_round_trip() {
    let store = store();
    let key = test_key("set");

    store.set_add(&key, "j1").await.expect("sadd");
    store.set_add(&key, "j2").await.expect("sadd");
    assert_eq!(store.set_size(&key).await.expect("scard"), 2);
    assert!(store.set_contains(&key, "j1").await.expect("sismember"));

    store.set_remove(&key, "j1").await.expect("srem");
    assert!(!store.set_contains(&key, "j1").await.expect("sismember"));
    assert_eq!(store.set_size(&key).await.expect("scard"), 1);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn semaphore_conserves_tokens() {
    let store = store();
    let sem = DistributedSemaphore::new(store, test_key("sem"), 2);

    sem.init().await.expect("init");
    assert_eq!(sem.available().await.expect("available"), 2);

    sem.acquire().await.expect("acquire");
    assert_eq!(sem.available().await.expect("available"), 1);
    sem.acquire().await.expect("acquire");
    assert_eq!(sem.available().await.expect("available"), 0);

    sem.release().await.expect("release");
    assert_eq!(sem.available().await.expect("available"), 1);
    sem.release().await.expect("release");
    assert_eq!(sem.available().await.expect("available"), 2);

    // Re-init restores exactly the configured capacity.
    sem.init().await.expect("init");
    assert_eq!(sem.available().await.expect("available"), 2);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn semaphore_blocks_until_release() {
    let store = store();
    let sem = DistributedSemaphore::new(store, test_key("sem"), 1);
    sem.init().await.expect("init");
    sem.acquire().await.expect("acquire");

    let waiter = {
        let sem = sem.clone();
        tokio::spawn(async move { sem.acquire().await })
    };

    // The waiter must still be blocked with no token available.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiter.is_finished());

    sem.release().await.expect("release");
    tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("waiter timed out")
        .expect("join")
        .expect("acquire");
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn job_state_writer_transitions() {
    let store = store();
    let writer = JobStateWriter::new(store);

    let job = Job::new("a1b2-v.mp4", Priority::High);
    writer.create(&job).await.expect("create");

    let loaded = writer.load(&job.id).await.expect("load").expect("present");
    assert_eq!(loaded, job);
    assert_eq!(
        writer.status(&job.id).await.expect("status"),
        Some(JobStatus::Queued)
    );
    assert_eq!(
        writer.video_url(&job.id).await.expect("videoUrl"),
        Some("a1b2-v.mp4".to_string())
    );

    writer
        .set_status(&job.id, JobStatus::DownloadingVideo)
        .await
        .expect("set_status");
    writer
        .set_audio_url(&job.id, "a1b2-v.mp3")
        .await
        .expect("set_audio_url");
    writer
        .set_subtitle_url(&job.id, "a1b2-v.srt")
        .await
        .expect("set_subtitle_url");

    let loaded = writer.load(&job.id).await.expect("load").expect("present");
    assert_eq!(loaded.status, JobStatus::DownloadingVideo);
    assert_eq!(loaded.audio_url.as_deref(), Some("a1b2-v.mp3"));
    assert_eq!(loaded.subtitle_url.as_deref(), Some("a1b2-v.srt"));

    // Retry counter is monotonic under atomic increments.
    assert_eq!(writer.increment_retry_count(&job.id).await.expect("incr"), 1);
    assert_eq!(writer.increment_retry_count(&job.id).await.expect("incr"), 2);

    writer
        .record_failure(&job.id, JobStatus::QueuedRetry, "upstream hiccup")
        .await
        .expect("record_failure");
    let loaded = writer.load(&job.id).await.expect("load").expect("present");
    assert_eq!(loaded.status, JobStatus::QueuedRetry);
    assert_eq!(loaded.error.as_deref(), Some("upstream hiccup"));
    assert_eq!(loaded.retry_count, 2);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn queue_depth_snapshot_tracks_pushes() {
    let store = store();

    let before = store.queue_depths().await.expect("depths");
    store
        .list_push_left(subgen_coord::keys::QUEUE_HIGH, "depth-probe")
        .await
        .expect("push");
    let after = store.queue_depths().await.expect("depths");
    assert_eq!(after.high, before.high + 1);

    // Drain the probe so repeated runs stay stable.
    let popped = store
        .list_blocking_pop_right(&[subgen_coord::keys::QUEUE_HIGH], Duration::from_secs(1))
        .await
        .expect("pop")
        .expect("value");
    assert_eq!(popped.1, "depth-probe");
}
