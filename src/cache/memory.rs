//! In-Memory Backend Module
//!
//! HashMap-backed key-value store with per-entry expiry and glob key
//! listing. Used when no Redis URL is configured and throughout the tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::backend::{glob_match, BackendResult, KvBackend};
use crate::cache::entry::CacheEntry;

// == Memory Backend ==
/// Process-local key-value store with `SETEX`/`KEYS` semantics.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryBackend {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Length ==
    /// Returns the number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|entry| !entry.is_expired()).count()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    // == TTL ==
    /// Remaining TTL in seconds of a live key.
    pub async fn ttl(&self, key: &str) -> Option<u64> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.ttl_remaining())
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it lazily, unless it was overwritten in between.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired()) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> BackendResult<()> {
        let entry = CacheEntry::new(value, ttl_secs);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> BackendResult<usize> {
        let mut entries = self.entries.write().await;
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| !entry.is_expired())
            .count();
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> BackendResult<()> {
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_backend_new() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.len().await, 0);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = MemoryBackend::new();

        backend.set_ex("key1", "value1".to_string(), 60).await.unwrap();

        assert_eq!(backend.get("key1").await.unwrap(), Some("value1".to_string()));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_ttl() {
        let backend = MemoryBackend::new();

        backend.set_ex("key1", "value1".to_string(), 1).await.unwrap();
        backend.set_ex("key1", "value2".to_string(), 60).await.unwrap();

        assert_eq!(backend.get("key1").await.unwrap(), Some("value2".to_string()));
        assert!(backend.ttl("key1").await.unwrap() > 1);
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let backend = MemoryBackend::new();

        backend.set_ex("key1", "value1".to_string(), 1).await.unwrap();
        assert!(backend.get("key1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(backend.get("key1").await.unwrap(), None);
        assert!(backend.keys("*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_del_counts_removed_keys() {
        let backend = MemoryBackend::new();
        backend.set_ex("a", "1".to_string(), 60).await.unwrap();
        backend.set_ex("b", "2".to_string(), 60).await.unwrap();

        let removed = backend
            .del(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_keys_matches_pattern() {
        let backend = MemoryBackend::new();
        for key in ["posts:recent:page:1", "posts:recent:page:2", "posts:user:1:page:1"] {
            backend.set_ex(key, "x".to_string(), 60).await.unwrap();
        }

        let keys = backend.keys("posts:recent:*").await.unwrap();
        assert_eq!(keys, vec!["posts:recent:page:1", "posts:recent:page:2"]);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let backend = MemoryBackend::new();

        backend.set_ex("key1", "value1".to_string(), 1).await.unwrap();
        backend.set_ex("key2", "value2".to_string(), 10).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(backend.cleanup_expired().await, 1);
        assert_eq!(backend.len().await, 1);
        assert!(backend.get("key2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let backend = MemoryBackend::new();
        let other = backend.clone();

        backend.set_ex("shared", "v".to_string(), 60).await.unwrap();
        assert_eq!(other.get("shared").await.unwrap(), Some("v".to_string()));
    }
}
