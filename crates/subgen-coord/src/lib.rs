//! Redis coordination layer for the subtitle pipeline.
//!
//! This crate provides:
//! - A typed facade over the shared Redis instance (queues, hashes, sets)
//! - The distributed counting semaphore backing the concurrency limits
//! - Atomic per-job state updates
//! - The queue-depth snapshot consumed by dashboard telemetry

pub mod error;
pub mod jobs;
pub mod keys;
pub mod semaphore;
pub mod snapshot;
pub mod store;

pub use error::{CoordError, CoordResult};
pub use jobs::JobStateWriter;
pub use semaphore::DistributedSemaphore;
pub use snapshot::QueueDepths;
pub use store::CoordStore;
