//! Typed facade over the shared Redis instance.

use std::collections::HashMap;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::debug;

use crate::error::{CoordError, CoordResult};

/// Client for the coordination store.
///
/// Cheap to clone; each operation obtains its own multiplexed connection so
/// blocking pops never stall unrelated commands.
#[derive(Clone)]
pub struct CoordStore {
    client: redis::Client,
}

impl CoordStore {
    /// Create a new store client.
    pub fn new(redis_url: &str) -> CoordResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from the `REDIS_URL` environment variable.
    pub fn from_env() -> CoordResult<Self> {
        let redis_url =
            std::env::var("REDIS_URL").map_err(|_| CoordError::config_error("REDIS_URL not set"))?;
        Self::new(&redis_url)
    }

    pub(crate) async fn conn(&self) -> CoordResult<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Set multiple fields on a hash.
    pub async fn hash_set_fields(&self, key: &str, fields: &[(&str, String)]) -> CoordResult<()> {
        let mut conn = self.conn().await?;
        conn.hset_multiple::<_, _, _, ()>(key, fields).await?;
        Ok(())
    }

    /// Read a single hash field.
    pub async fn hash_get_field(&self, key: &str, field: &str) -> CoordResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.hget(key, field).await?)
    }

    /// Read all fields of a hash. Empty map if the key does not exist.
    pub async fn hash_get_all(&self, key: &str) -> CoordResult<HashMap<String, String>> {
        let mut conn = self.conn().await?;
        Ok(conn.hgetall(key).await?)
    }

    /// Atomically increment a hash field, returning the new value.
    pub async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> CoordResult<i64> {
        let mut conn = self.conn().await?;
        Ok(conn.hincr(key, field, delta).await?)
    }

    /// Push a value onto the left end of a list.
    pub async fn list_push_left(&self, list: &str, value: &str) -> CoordResult<()> {
        let mut conn = self.conn().await?;
        conn.lpush::<_, _, ()>(list, value).await?;
        Ok(())
    }

    /// Push a value onto the right end of a list.
    pub async fn list_push_right(&self, list: &str, value: &str) -> CoordResult<()> {
        let mut conn = self.conn().await?;
        conn.rpush::<_, _, ()>(list, value).await?;
        Ok(())
    }

    /// Blocking pop from the right end of the first non-empty list.
    ///
    /// `lists` is scanned in order on every wakeup, so earlier keys have
    /// strict priority. A zero timeout blocks indefinitely. Returns the
    /// source list and the popped value.
    pub async fn list_blocking_pop_right(
        &self,
        lists: &[&str],
        timeout: Duration,
    ) -> CoordResult<Option<(String, String)>> {
        let mut conn = self.conn().await?;
        let reply: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(lists)
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await?;
        if let Some((list, value)) = &reply {
            debug!(list = %list, value = %value, "Popped from list");
        }
        Ok(reply)
    }

    /// Length of a list. Zero if the key does not exist.
    pub async fn list_len(&self, list: &str) -> CoordResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.llen(list).await?)
    }

    /// Delete a list wholesale.
    pub async fn list_delete(&self, list: &str) -> CoordResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(list).await?;
        Ok(())
    }

    /// Add a member to a set.
    pub async fn set_add(&self, set: &str, value: &str) -> CoordResult<()> {
        let mut conn = self.conn().await?;
        conn.sadd::<_, _, ()>(set, value).await?;
        Ok(())
    }

    /// Remove a member from a set.
    pub async fn set_remove(&self, set: &str, value: &str) -> CoordResult<()> {
        let mut conn = self.conn().await?;
        conn.srem::<_, _, ()>(set, value).await?;
        Ok(())
    }

    /// Cardinality of a set.
    pub async fn set_size(&self, set: &str) -> CoordResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.scard(set).await?)
    }

    /// Membership test.
    pub async fn set_contains(&self, set: &str, value: &str) -> CoordResult<bool> {
        let mut conn = self.conn().await?;
        Ok(conn.sismember(set, value).await?)
    }
}
