//! Cache Warmer Module
//!
//! Proactively loads the most recent users and posts and the system stats
//! into the cache. Every step is best effort: a failed query or write is
//! logged and the remaining steps still run.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{keys, Cache, CacheType};
use crate::config::CachePolicy;
use crate::metrics;
use crate::models::PublicUser;
use crate::store::RecordStore;

// == Warm Report ==
/// What a single warm run managed to write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    pub users_warmed: usize,
    pub posts_warmed: usize,
    pub stats_warmed: bool,
}

// == Cache Warmer ==
#[derive(Clone)]
pub struct CacheWarmer {
    store: Arc<dyn RecordStore>,
    cache: Cache,
    policy: CachePolicy,
}

impl CacheWarmer {
    pub fn new(store: Arc<dyn RecordStore>, cache: Cache, policy: CachePolicy) -> Self {
        Self {
            store,
            cache,
            policy,
        }
    }

    // == Warm ==
    /// Runs one warm pass and reports what was written.
    pub async fn warm(&self) -> WarmReport {
        info!(
            user_limit = self.policy.warm_user_limit,
            post_limit = self.policy.warm_post_limit,
            "Cache warming started"
        );

        let report = WarmReport {
            users_warmed: self.warm_users().await,
            posts_warmed: self.warm_posts().await,
            stats_warmed: self.warm_stats().await,
        };

        metrics::record_warm_run(self.cache.instance());
        info!(
            users = report.users_warmed,
            posts = report.posts_warmed,
            stats = report.stats_warmed,
            "Cache warming finished"
        );

        report
    }

    async fn warm_users(&self) -> usize {
        let users = match self.store.recent_users(self.policy.warm_user_limit).await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "Cache warming: loading recent users failed");
                return 0;
            }
        };

        let mut warmed = 0;
        for user in users {
            let key = keys::user_key(user.id);
            let public = PublicUser::from(user);
            if self
                .cache
                .set(&key, &public, self.policy.user_ttl, CacheType::User)
                .await
            {
                warmed += 1;
            }
        }
        warmed
    }

    async fn warm_posts(&self) -> usize {
        let posts = match self
            .store
            .recent_posts(1, self.policy.warm_post_limit)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                warn!(error = %e, "Cache warming: loading recent posts failed");
                return 0;
            }
        };

        let mut warmed = 0;
        for post in posts {
            let key = keys::post_key(post.id);
            if self
                .cache
                .set(&key, &post, self.policy.post_ttl, CacheType::Post)
                .await
            {
                warmed += 1;
            }
        }
        warmed
    }

    async fn warm_stats(&self) -> bool {
        match self.store.system_stats().await {
            Ok(stats) => {
                self.cache
                    .set(
                        &keys::system_stats_key(),
                        &stats,
                        self.policy.stats_ttl,
                        CacheType::System,
                    )
                    .await
            }
            Err(e) => {
                warn!(error = %e, "Cache warming: computing system stats failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{KvBackend, MemoryBackend, UnavailableBackend};
    use crate::models::{NewPost, NewUser, PostWithAuthor, SystemStats};
    use crate::store::MemoryStore;

    async fn seeded_store(users: usize, posts: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..users {
            store
                .insert_user(NewUser {
                    username: format!("user{}", i),
                    email: format!("user{}@example.com", i),
                    password_hash: "hash".to_string(),
                })
                .await
                .unwrap();
        }
        for i in 0..posts {
            store
                .insert_post(NewPost {
                    user_id: 1,
                    content: format!("post {}", i),
                    image_url: None,
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_warm_populates_entities_and_stats() {
        let store = seeded_store(2, 1).await;
        let backend = MemoryBackend::new();
        let cache = Cache::new(Arc::new(backend.clone()), "test");
        let warmer = CacheWarmer::new(Arc::new(store), cache.clone(), CachePolicy::default());

        let report = warmer.warm().await;

        assert_eq!(
            report,
            WarmReport {
                users_warmed: 2,
                posts_warmed: 1,
                stats_warmed: true
            }
        );
        assert_eq!(backend.keys("user:*").await.unwrap(), vec!["user:1", "user:2"]);
        assert_eq!(backend.keys("post:*").await.unwrap(), vec!["post:1"]);
        assert_eq!(backend.keys("stats:*").await.unwrap(), vec!["stats:system"]);
        assert_eq!(backend.len().await, 4);

        let post: PostWithAuthor = cache.get("post:1", CacheType::Post).await.unwrap();
        assert_eq!(post.username, "user0");
        let stats: SystemStats = cache.get("stats:system", CacheType::System).await.unwrap();
        assert_eq!(stats.total_users, 2);
    }

    #[tokio::test]
    async fn test_warm_respects_limits_and_ttls() {
        let store = seeded_store(5, 5).await;
        let backend = MemoryBackend::new();
        let cache = Cache::new(Arc::new(backend.clone()), "test");
        let policy = CachePolicy {
            warm_user_limit: 3,
            warm_post_limit: 2,
            ..CachePolicy::default()
        };

        let report = CacheWarmer::new(Arc::new(store), cache, policy).warm().await;

        assert_eq!(report.users_warmed, 3);
        assert_eq!(report.posts_warmed, 2);
        // Most recent first
        assert_eq!(
            backend.keys("user:*").await.unwrap(),
            vec!["user:3", "user:4", "user:5"]
        );
        assert!(backend.ttl("user:5").await.unwrap() > 800);
        assert!(backend.ttl("stats:system").await.unwrap() <= 60);
    }

    #[tokio::test]
    async fn test_warm_with_failing_cache_is_partial_not_fatal() {
        let store = seeded_store(2, 1).await;
        let cache = Cache::new(Arc::new(UnavailableBackend::new("down")), "test");

        let report = CacheWarmer::new(Arc::new(store.clone()), cache, CachePolicy::default())
            .warm()
            .await;

        assert_eq!(report, WarmReport::default());
        // Three seeding inserts, then all three warming queries still ran
        assert_eq!(store.query_count(), 3 + 3);
    }
}
