//! Cache Statistics Module
//!
//! In-process snapshot of cache accessor activity. Mirrors the counters sent
//! to the metrics registry so they can be inspected without Prometheus.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::CacheType;

// == Per-Type Counters ==
/// Hit/miss counters for one logical cache type.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TypeCounters {
    pub hits: u64,
    pub misses: u64,
}

// == Cache Stats ==
/// Tracks cache accessor activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (absent, expired or errored)
    pub misses: u64,
    /// Number of backend or serialization errors, all operations
    pub errors: u64,
    /// Number of successful writes
    pub sets: u64,
    /// Number of successful single-key deletes
    pub deletes: u64,
    /// Number of keys removed through pattern invalidation
    pub invalidated: u64,
    /// Hit/miss breakdown by cache type
    pub by_type: BTreeMap<&'static str, TypeCounters>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self, cache_type: CacheType) {
        self.hits += 1;
        self.by_type.entry(cache_type.as_str()).or_default().hits += 1;
    }

    pub fn record_miss(&mut self, cache_type: CacheType) {
        self.misses += 1;
        self.by_type.entry(cache_type.as_str()).or_default().misses += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    pub fn record_invalidated(&mut self, count: usize) {
        self.invalidated += count as u64;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.errors, 0);
        assert!(stats.by_type.is_empty());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit(CacheType::User);
        stats.record_miss(CacheType::Post);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_by_type_breakdown() {
        let mut stats = CacheStats::new();
        stats.record_hit(CacheType::User);
        stats.record_hit(CacheType::User);
        stats.record_miss(CacheType::User);
        stats.record_miss(CacheType::System);

        assert_eq!(
            stats.by_type["user"],
            TypeCounters { hits: 2, misses: 1 }
        );
        assert_eq!(
            stats.by_type["system"],
            TypeCounters { hits: 0, misses: 1 }
        );
    }

    #[test]
    fn test_record_invalidated_accumulates() {
        let mut stats = CacheStats::new();
        stats.record_invalidated(3);
        stats.record_invalidated(0);
        stats.record_invalidated(2);
        assert_eq!(stats.invalidated, 5);
    }
}
