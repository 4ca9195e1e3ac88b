//! Redis Backend Module
//!
//! `KvBackend` over a multiplexed, auto-reconnecting Redis connection.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::cache::backend::{BackendError, BackendResult, KvBackend};

// == Redis Backend ==
/// Redis-backed key-value store.
///
/// Every command is bounded by `timeout` so a stalled server degrades into
/// cache misses instead of stalled requests.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisBackend {
    // == Connect ==
    /// Opens a connection manager to `url` and verifies it with `PING`.
    pub async fn connect(url: &str, timeout: Duration) -> BackendResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = bounded(timeout, ConnectionManager::new(client)).await?;

        let backend = Self { conn, timeout };
        backend.ping().await?;
        info!("Connected to Redis");

        Ok(backend)
    }
}

/// Runs a Redis future under a deadline.
async fn bounded<T, F>(timeout: Duration, fut: F) -> BackendResult<T>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(BackendError::from),
        Err(_) => Err(BackendError::Timeout(timeout.as_millis() as u64)),
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        let mut conn = self.conn.clone();
        bounded(self.timeout, conn.get(key)).await
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> BackendResult<()> {
        let mut conn = self.conn.clone();
        bounded(self.timeout, conn.set_ex(key, value, ttl_secs)).await
    }

    async fn del(&self, keys: &[String]) -> BackendResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        bounded(self.timeout, conn.del(keys)).await
    }

    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>> {
        let mut conn = self.conn.clone();
        bounded(self.timeout, conn.keys(pattern)).await
    }

    async fn ping(&self) -> BackendResult<()> {
        let mut conn = self.conn.clone();
        let _: String = bounded(self.timeout, redis::cmd("PING").query_async(&mut conn)).await?;
        Ok(())
    }
}
