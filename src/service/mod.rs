//! Service Module
//!
//! Cache-aside orchestration for every endpoint.
//!
//! Reads: compute the key, try the cache, and on a miss run exactly one store
//! query and populate the cache best effort. A hit never reaches the store.
//!
//! Writes: mutate the store of record first; only after it succeeds populate
//! the new entity's keys and invalidate the aggregate keys it makes stale.
//! Cache failures never fail the write.

mod posts;
mod users;

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{keys, Cache, CacheStats, CacheType, CacheWarmer, Lookup, WarmReport};
use crate::config::CachePolicy;
use crate::error::{AppError, Result};
use crate::models::SystemStats;
use crate::store::RecordStore;

// == Fetched ==
/// A value read through the cache, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub cache_hit: bool,
}

impl<T> Fetched<T> {
    fn hit(value: T) -> Self {
        Self {
            value,
            cache_hit: true,
        }
    }

    fn miss(value: T) -> Self {
        Self {
            value,
            cache_hit: false,
        }
    }
}

// == MiniGram ==
/// The MiniGram service: store of record plus cache, with explicit
/// lifecycle (construct, `health`, `close`).
#[derive(Clone)]
pub struct MiniGram {
    store: Arc<dyn RecordStore>,
    cache: Cache,
    policy: CachePolicy,
    password_cost: u32,
}

impl MiniGram {
    pub fn new(store: Arc<dyn RecordStore>, cache: Cache, policy: CachePolicy) -> Self {
        Self {
            store,
            cache,
            policy,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Overrides the bcrypt work factor used when registering users.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn warmer(&self) -> CacheWarmer {
        CacheWarmer::new(self.store.clone(), self.cache.clone(), self.policy)
    }

    // == Read Through ==
    /// Cache-aside read of `key`.
    ///
    /// `load` runs only on a miss; its `Ok` value is cached for `ttl_secs`,
    /// its `Err` is returned as is and nothing is cached.
    async fn read_through<T, F, Fut>(
        &self,
        key: &str,
        cache_type: CacheType,
        ttl_secs: u64,
        load: F,
    ) -> Result<Fetched<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Lookup::Hit(value) = self.cache.lookup::<T>(key, cache_type).await {
            return Ok(Fetched::hit(value));
        }

        let value = load().await?;
        self.cache.set(key, &value, ttl_secs, cache_type).await;
        Ok(Fetched::miss(value))
    }

    // == System Stats ==
    /// Aggregate counters, cached under `stats:system` for `stats_ttl`.
    pub async fn system_stats(&self) -> Result<Fetched<SystemStats>> {
        self.read_through(
            &keys::system_stats_key(),
            CacheType::System,
            self.policy.stats_ttl,
            || async { self.store.system_stats().await.map_err(AppError::from) },
        )
        .await
    }

    // == Cache Administration ==
    pub async fn warm(&self) -> WarmReport {
        self.warmer().warm().await
    }

    pub async fn invalidate(&self, pattern: &str) -> usize {
        self.cache.invalidate(pattern).await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    // == Lifecycle ==
    /// Returns `(store_up, cache_up)`.
    pub async fn health(&self) -> (bool, bool) {
        let store_up = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "store of record health check failed");
                false
            }
        };
        (store_up, self.cache.is_available().await)
    }

    /// Releases the store's pooled connections.
    pub async fn close(&self) {
        self.store.close().await;
    }

    /// Drops the aggregate entries a new user or post makes stale.
    async fn invalidate_after_write(&self, patterns: &[String]) {
        for pattern in patterns {
            self.cache.invalidate(pattern).await;
        }
        self.cache
            .delete(&keys::system_stats_key(), CacheType::System)
            .await;
    }
}
