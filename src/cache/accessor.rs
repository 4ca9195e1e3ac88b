//! Cache Accessor Module
//!
//! Fail-open get/set/delete/invalidate over a `KvBackend`, instrumented with
//! latency histograms and hit/miss counters.
//!
//! Every public operation swallows backend and serialization errors: a failed
//! read is a miss, a failed write or delete returns `false`, a failed
//! invalidation removes nothing. Errors are still logged and counted.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::backend::KvBackend;
use crate::cache::stats::CacheStats;
use crate::metrics;

// == Cache Type ==
/// Logical type tag of a cache entry. Only used for labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheType {
    User,
    Users,
    Post,
    Posts,
    System,
}

impl CacheType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::User => "user",
            CacheType::Users => "users",
            CacheType::Post => "post",
            CacheType::Posts => "posts",
            CacheType::System => "system",
        }
    }
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Lookup ==
/// Outcome of a single read, before errors are collapsed into misses.
#[derive(Debug)]
pub enum Lookup<T> {
    Hit(T),
    Miss,
    Error(String),
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Error(_) => None,
        }
    }
}

// == Cache ==
/// Cache-aside accessor shared by all request handlers.
///
/// Cloning is cheap and shares the backend and statistics.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn KvBackend>,
    instance: Arc<str>,
    stats: Arc<RwLock<CacheStats>>,
}

impl Cache {
    // == Constructor ==
    pub fn new(backend: Arc<dyn KvBackend>, instance: impl Into<Arc<str>>) -> Self {
        Self {
            backend,
            instance: instance.into(),
            stats: Arc::new(RwLock::new(CacheStats::new())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    // == Lookup ==
    /// Reads and deserializes `key`, keeping errors distinguishable.
    ///
    /// Counters are updated here: a hit counts as a hit, both `Miss` and
    /// `Error` count as misses, and `Error` additionally as an error.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str, cache_type: CacheType) -> Lookup<T> {
        let started = Instant::now();

        let outcome = match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => Lookup::Hit(value),
                Err(e) => Lookup::Error(format!("deserialization failed: {}", e)),
            },
            Ok(None) => Lookup::Miss,
            Err(e) => Lookup::Error(e.to_string()),
        };

        self.observe("get", cache_type, started);

        match &outcome {
            Lookup::Hit(_) => {
                debug!(key = %key, cache_type = %cache_type, "cache hit");
                metrics::record_cache_hit(cache_type.as_str(), &self.instance);
                self.stats.write().await.record_hit(cache_type);
            }
            Lookup::Miss => {
                debug!(key = %key, cache_type = %cache_type, "cache miss");
                metrics::record_cache_miss(cache_type.as_str(), &self.instance);
                self.stats.write().await.record_miss(cache_type);
            }
            Lookup::Error(reason) => {
                warn!(key = %key, cache_type = %cache_type, error = %reason, "cache get failed");
                metrics::record_cache_miss(cache_type.as_str(), &self.instance);
                self.record_error("get", cache_type).await;
                self.stats.write().await.record_miss(cache_type);
            }
        }

        outcome
    }

    // == Get ==
    /// Returns the cached value, or `None` on miss or any failure.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, cache_type: CacheType) -> Option<T> {
        self.lookup(key, cache_type).await.into_option()
    }

    // == Set ==
    /// Serializes and stores `value` under `key` for `ttl_secs` seconds.
    ///
    /// Returns `false` on any failure; nothing is raised.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
        cache_type: CacheType,
    ) -> bool {
        let started = Instant::now();

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, cache_type = %cache_type, error = %e, "cache serialization failed");
                self.observe("set", cache_type, started);
                self.record_error("set", cache_type).await;
                return false;
            }
        };

        let result = self.backend.set_ex(key, json, ttl_secs).await;
        self.observe("set", cache_type, started);

        match result {
            Ok(()) => {
                debug!(key = %key, ttl_secs, cache_type = %cache_type, "cache set");
                self.stats.write().await.record_set();
                true
            }
            Err(e) => {
                warn!(key = %key, cache_type = %cache_type, error = %e, "cache set failed");
                self.record_error("set", cache_type).await;
                false
            }
        }
    }

    // == Delete ==
    /// Removes `key`. Returns `true` if the backend call succeeded, whether or
    /// not the key existed.
    pub async fn delete(&self, key: &str, cache_type: CacheType) -> bool {
        let started = Instant::now();
        let result = self.backend.del(&[key.to_string()]).await;
        self.observe("delete", cache_type, started);

        match result {
            Ok(_) => {
                debug!(key = %key, cache_type = %cache_type, "cache delete");
                self.stats.write().await.record_delete();
                true
            }
            Err(e) => {
                warn!(key = %key, cache_type = %cache_type, error = %e, "cache delete failed");
                self.record_error("delete", cache_type).await;
                false
            }
        }
    }

    // == Invalidate ==
    /// Deletes every key matching the glob `pattern`.
    ///
    /// Returns the number of keys removed; `0` if none matched or the backend
    /// failed. Lists the whole keyspace on Redis (`KEYS`).
    pub async fn invalidate(&self, pattern: &str) -> usize {
        let started = Instant::now();

        let keys = match self.backend.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "cache invalidation scan failed");
                self.observe_untyped("invalidate", started);
                self.record_untyped_error("invalidate").await;
                return 0;
            }
        };

        if keys.is_empty() {
            self.observe_untyped("invalidate", started);
            debug!(pattern = %pattern, "cache invalidation matched nothing");
            return 0;
        }

        let result = self.backend.del(&keys).await;
        self.observe_untyped("invalidate", started);

        match result {
            Ok(removed) => {
                debug!(pattern = %pattern, removed, "cache invalidated");
                metrics::record_invalidated_keys(&self.instance, removed);
                self.stats.write().await.record_invalidated(removed);
                removed
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "cache invalidation delete failed");
                self.record_untyped_error("invalidate").await;
                0
            }
        }
    }

    // == Health ==
    /// `true` when the backend answers `PING`.
    pub async fn is_available(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "cache backend ping failed");
                false
            }
        }
    }

    // == Stats ==
    /// Snapshot of accessor activity since startup.
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    fn observe(&self, operation: &str, cache_type: CacheType, started: Instant) {
        metrics::record_cache_operation(
            operation,
            cache_type.as_str(),
            &self.instance,
            started.elapsed(),
        );
    }

    fn observe_untyped(&self, operation: &str, started: Instant) {
        metrics::record_cache_operation(operation, "pattern", &self.instance, started.elapsed());
    }

    async fn record_error(&self, operation: &str, cache_type: CacheType) {
        metrics::record_cache_error(operation, cache_type.as_str(), &self.instance);
        self.stats.write().await.record_error();
    }

    async fn record_untyped_error(&self, operation: &str) {
        metrics::record_cache_error(operation, "pattern", &self.instance);
        self.stats.write().await.record_error();
    }
}
