//! Response DTOs for the MiniGram API
//!
//! Defines the structure of outgoing HTTP response bodies that are not plain
//! domain records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::{CacheStats, TypeCounters};

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" when the store answers, "degraded" otherwise
    pub status: String,
    /// "up" / "down"
    pub store: String,
    /// "up" / "down"
    pub cache: String,
    /// Cache backend in use ("redis", "memory", "unavailable")
    pub cache_backend: String,
    /// Identity of this instance
    pub instance: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(store_up: bool, cache_up: bool, cache_backend: &str, instance: &str) -> Self {
        let up = |flag: bool| (if flag { "up" } else { "down" }).to_string();
        Self {
            status: (if store_up { "healthy" } else { "degraded" }).to_string(),
            store: up(store_up),
            cache: up(cache_up),
            cache_backend: cache_backend.to_string(),
            instance: instance.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for DELETE /api/cache
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub pattern: String,
    pub removed: usize,
}

/// Response body for GET /api/cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub instance: String,
    pub backend: String,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub sets: u64,
    pub deletes: u64,
    pub invalidated: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub by_type: BTreeMap<&'static str, TypeCounters>,
}

impl CacheStatsResponse {
    pub fn new(stats: CacheStats, backend: &str, instance: &str) -> Self {
        Self {
            instance: instance.to_string(),
            backend: backend.to_string(),
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            errors: stats.errors,
            sets: stats.sets,
            deletes: stats.deletes,
            invalidated: stats.invalidated,
            by_type: stats.by_type,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
