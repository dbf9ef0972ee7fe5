//! The worker loop: acquire a slot, pull the next job, dispatch.

use std::sync::Arc;
use std::time::Duration;

use subgen_coord::keys::{QUEUE_HIGH, QUEUE_LOW};
use subgen_coord::{CoordStore, DistributedSemaphore};
use subgen_models::JobId;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::JobPipeline;

/// One worker process's loop over the shared queues.
///
/// The slot is acquired before the queue pop so a job is never claimed by a
/// worker that cannot immediately run it. One job runs at a time per loop;
/// fleet parallelism comes from running more workers against the same
/// global semaphore.
pub struct Worker {
    store: CoordStore,
    global_semaphore: DistributedSemaphore,
    pipeline: Arc<JobPipeline>,
    store_error_backoff: Duration,
    shutdown: tokio::sync::watch::Sender<bool>,
    name: String,
}

impl Worker {
    pub fn new(
        store: CoordStore,
        global_semaphore: DistributedSemaphore,
        pipeline: Arc<JobPipeline>,
        store_error_backoff: Duration,
    ) -> Self {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        Self {
            store,
            global_semaphore,
            pipeline,
            store_error_backoff,
            shutdown,
            name: format!("worker-{}", Uuid::new_v4()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the loop to stop after the current job.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Run until shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(worker = %self.name, "Worker loop started");
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            // A claim cancelled between acquire and pop strands one slot
            // token until the next boot re-initializes the semaphore.
            let claimed = tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
                claimed = self.claim_next() => claimed,
            };

            match claimed {
                Ok(job_id) => {
                    debug!(worker = %self.name, job_id = %job_id, "Dispatching job");
                    self.pipeline.execute(&job_id).await;
                    if let Err(e) = self.global_semaphore.release().await {
                        error!(worker = %self.name, error = %e, "Failed to release worker slot");
                    }
                }
                Err(e) => {
                    error!(
                        worker = %self.name,
                        error = %e,
                        "Worker loop failure, backing off"
                    );
                    // The slot may or may not be held at this point; put a
                    // token back rather than leak capacity.
                    if let Err(release_err) = self.global_semaphore.release().await {
                        debug!(
                            worker = %self.name,
                            error = %release_err,
                            "Defensive slot release failed"
                        );
                    }
                    tokio::time::sleep(self.store_error_backoff).await;
                }
            }
        }

        info!(worker = %self.name, "Worker loop stopped");
        Ok(())
    }

    /// Take a worker slot, then block for the next job id, high queue first.
    async fn claim_next(&self) -> WorkerResult<JobId> {
        self.global_semaphore.acquire().await?;

        let popped = self
            .store
            .list_blocking_pop_right(&[QUEUE_HIGH, QUEUE_LOW], Duration::ZERO)
            .await?;

        match popped {
            Some((queue, job_id)) => {
                debug!(worker = %self.name, queue = %queue, job_id = %job_id, "Claimed job");
                Ok(JobId::from(job_id))
            }
            // Unreachable with an infinite wait; treat as a store anomaly.
            None => Err(WorkerError::Coord(
                subgen_coord::CoordError::connection_failed("blocking pop returned empty"),
            )),
        }
    }
}
