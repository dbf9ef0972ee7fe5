//! Distributed counting semaphore backed by a Redis token list.

use tracing::info;

use crate::error::CoordResult;
use crate::store::CoordStore;

/// Placeholder token value. Tokens are unordered and interchangeable.
const TOKEN: &str = "1";

/// A fleet-wide counting semaphore.
///
/// Capacity is expressed as N placeholder tokens in a list: `acquire` is a
/// blocking pop from the right, `release` a push to the left. At any instant
/// `in_flight + tokens_in_list = capacity`, modulo the brief window inside an
/// acquire or release.
///
/// Callers must pair every `acquire` with exactly one `release` on all exit
/// paths; the store cannot detect over-release.
#[derive(Clone)]
pub struct DistributedSemaphore {
    store: CoordStore,
    key: String,
    capacity: usize,
}

impl DistributedSemaphore {
    pub fn new(store: CoordStore, key: impl Into<String>, capacity: usize) -> Self {
        Self {
            store,
            key: key.into(),
            capacity,
        }
    }

    /// Replace the backing list with exactly `capacity` tokens.
    ///
    /// Runs as a single MULTI/EXEC so observers never see a partially filled
    /// list. Must happen once per deployment; workers booting concurrently
    /// race the refill and may briefly over-supply tokens.
    pub async fn init(&self) -> CoordResult<()> {
        let mut conn = self.store.conn().await?;
        let mut pipe = redis::pipe();
        pipe.atomic().del(&self.key).ignore();
        for _ in 0..self.capacity {
            pipe.lpush(&self.key, TOKEN).ignore();
        }
        pipe.query_async::<()>(&mut conn).await?;
        info!(semaphore = %self.key, capacity = self.capacity, "Initialized semaphore");
        Ok(())
    }

    /// Take one token, blocking until one is available.
    pub async fn acquire(&self) -> CoordResult<()> {
        let mut conn = self.store.conn().await?;
        // Zero timeout blocks until a token arrives, so the reply is never nil.
        let _reply: (String, String) = redis::cmd("BRPOP")
            .arg(&self.key)
            .arg(0)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Return one token.
    pub async fn release(&self) -> CoordResult<()> {
        self.store.list_push_left(&self.key, TOKEN).await
    }

    /// Tokens currently available.
    pub async fn available(&self) -> CoordResult<u64> {
        self.store.list_len(&self.key).await
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}
