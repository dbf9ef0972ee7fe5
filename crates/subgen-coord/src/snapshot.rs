//! Queue-depth snapshot for dashboard telemetry.

use crate::error::CoordResult;
use crate::keys::{JOBS_PROCESSING, QUEUE_DLQ, QUEUE_HIGH, QUEUE_LOW};
use crate::store::CoordStore;

/// Point-in-time view of the queues and the processing set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueDepths {
    pub high: u64,
    pub low: u64,
    pub dlq: u64,
    pub processing: u64,
}

impl CoordStore {
    /// Read all four depths in one MULTI/EXEC so the snapshot is consistent.
    pub async fn queue_depths(&self) -> CoordResult<QueueDepths> {
        let mut conn = self.conn().await?;
        let (high, low, dlq, processing): (u64, u64, u64, u64) = redis::pipe()
            .atomic()
            .llen(QUEUE_HIGH)
            .llen(QUEUE_LOW)
            .llen(QUEUE_DLQ)
            .scard(JOBS_PROCESSING)
            .query_async(&mut conn)
            .await?;
        Ok(QueueDepths {
            high,
            low,
            dlq,
            processing,
        })
    }
}
