//! Post creation and feed reads.

use tracing::info;

use super::{Fetched, MiniGram};
use crate::cache::{keys, CacheType};
use crate::error::{AppError, Result};
use crate::models::{CreatePostRequest, NewPost, PostWithAuthor};

impl MiniGram {
    // == Create Post ==
    /// Inserts a post, caches it, and drops every feed page it could appear
    /// on together with the system stats.
    pub async fn create_post(&self, req: CreatePostRequest) -> Result<PostWithAuthor> {
        if let Some(msg) = req.validate() {
            return Err(AppError::Validation(msg));
        }
        let user_id = req.user_id.unwrap_or_default();

        let author = self.get_user(user_id).await?.value;

        let post = self
            .store
            .insert_post(NewPost {
                user_id,
                content: req.content.trim().to_string(),
                image_url: req.image_url.filter(|url| !url.trim().is_empty()),
            })
            .await?;
        info!(post_id = post.id, user_id, "post created");

        let post = PostWithAuthor {
            id: post.id,
            user_id: post.user_id,
            username: author.username,
            content: post.content,
            image_url: post.image_url,
            created_at: post.created_at,
        };

        self.cache
            .set(
                &keys::post_key(post.id),
                &post,
                self.policy.post_ttl,
                CacheType::Post,
            )
            .await;
        self.invalidate_after_write(&[
            keys::recent_posts_pattern(),
            keys::user_posts_pattern(user_id),
        ])
        .await;

        Ok(post)
    }

    // == Get Post ==
    pub async fn get_post(&self, id: i64) -> Result<Fetched<PostWithAuthor>> {
        self.read_through(
            &keys::post_key(id),
            CacheType::Post,
            self.policy.post_ttl,
            || async {
                match self.store.find_post(id).await? {
                    Some(post) => Ok(post),
                    None => Err(AppError::NotFound(format!("Post {} not found", id))),
                }
            },
        )
        .await
    }

    // == Recent Posts ==
    pub async fn recent_posts(&self, page: i64, limit: i64) -> Result<Fetched<Vec<PostWithAuthor>>> {
        self.read_through(
            &keys::recent_posts_key(page, limit),
            CacheType::Posts,
            self.policy.list_ttl,
            || async {
                self.store
                    .recent_posts(page, limit)
                    .await
                    .map_err(AppError::from)
            },
        )
        .await
    }

    // == User Posts ==
    pub async fn user_posts(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Fetched<Vec<PostWithAuthor>>> {
        self.read_through(
            &keys::user_posts_key(user_id, page, limit),
            CacheType::Posts,
            self.policy.list_ttl,
            || async {
                self.store
                    .user_posts(user_id, page, limit)
                    .await
                    .map_err(AppError::from)
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::cache::{keys, KvBackend, MemoryBackend};
    use crate::error::AppError;
    use crate::models::requests::MAX_PAGE;
    use crate::models::{CreatePostRequest, PageQuery, RegisterRequest};
    use crate::service::MiniGram;
    use crate::store::MemoryStore;

    async fn with_user(service: &MiniGram, name: &str) -> i64 {
        service
            .register(RegisterRequest {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password: "secret123".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    fn post_request(user_id: i64, content: &str) -> CreatePostRequest {
        CreatePostRequest {
            user_id: Some(user_id),
            content: content.to_string(),
            image_url: Some("https://img.example.com/1.jpg".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_post_populates_and_invalidates() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);
        let alice = with_user(&service, "alice").await;
        let bob = with_user(&service, "bob").await;

        // Warm some feed pages
        service.recent_posts(1, 20).await.unwrap();
        service.recent_posts(2, 20).await.unwrap();
        service.user_posts(alice, 1, 20).await.unwrap();
        service.user_posts(bob, 1, 20).await.unwrap();
        service.system_stats().await.unwrap();

        let post = service.create_post(post_request(alice, "hello")).await.unwrap();

        assert_eq!(post.username, "alice");
        assert!(backend.get("post:1").await.unwrap().is_some());
        assert!(backend.keys("posts:recent:*").await.unwrap().is_empty());
        assert!(backend.keys("posts:user:1:*").await.unwrap().is_empty());
        assert_eq!(
            backend.keys("posts:user:2:*").await.unwrap(),
            vec!["posts:user:2:page:1:limit:20"]
        );
        assert!(backend.get("stats:system").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_post_visible_in_feed_after_write() {
        let store = MemoryStore::new();
        let service = service(&store, &MemoryBackend::new());
        let alice = with_user(&service, "alice").await;

        assert!(service.recent_posts(1, 20).await.unwrap().value.is_empty());
        service.create_post(post_request(alice, "first")).await.unwrap();

        let feed = service.recent_posts(1, 20).await.unwrap();
        assert!(!feed.cache_hit);
        assert_eq!(feed.value.len(), 1);
        assert_eq!(feed.value[0].content, "first");
    }

    #[tokio::test]
    async fn test_create_post_for_unknown_user() {
        let store = MemoryStore::new();
        let service = service(&store, &MemoryBackend::new());

        let err = service
            .create_post(post_request(42, "orphan"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(service.recent_posts(1, 20).await.unwrap().value.is_empty());
    }

    #[tokio::test]
    async fn test_create_post_validation() {
        let store = MemoryStore::new();
        let service = service(&store, &MemoryBackend::new());

        let err = service
            .create_post(CreatePostRequest {
                user_id: None,
                content: "x".to_string(),
                image_url: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_get_post_read_through() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);
        let alice = with_user(&service, "alice").await;
        let created = service.create_post(post_request(alice, "hello")).await.unwrap();

        let hit = service.get_post(created.id).await.unwrap();
        assert!(hit.cache_hit);
        assert_eq!(hit.value, created);

        backend.del(&["post:1".to_string()]).await.unwrap();
        let queries = store.query_count();
        let miss = service.get_post(created.id).await.unwrap();
        assert!(!miss.cache_hit);
        assert_eq!(store.query_count(), queries + 1);
        assert_eq!(miss.value.content, "hello");

        assert!(matches!(
            service.get_post(404).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_huge_page_is_empty_and_cached_under_its_own_key() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);
        let alice = with_user(&service, "alice").await;
        service.create_post(post_request(alice, "only")).await.unwrap();

        let query = PageQuery {
            page: Some(i64::MAX),
            limit: Some(20),
        };
        let feed = service.recent_posts(query.page(), query.limit()).await.unwrap();
        let mine = service
            .user_posts(alice, query.page(), query.limit())
            .await
            .unwrap();

        assert!(feed.value.is_empty());
        assert!(mine.value.is_empty());
        assert!(backend
            .get(&keys::recent_posts_key(MAX_PAGE, 20))
            .await
            .unwrap()
            .is_some());
        assert_eq!(service.recent_posts(1, 20).await.unwrap().value.len(), 1);
    }

    #[tokio::test]
    async fn test_feed_served_from_store_when_cache_fails() {
        let store = MemoryStore::new();
        let service = failing_cache_service(&store);
        let alice = with_user(&service, "alice").await;
        service.create_post(post_request(alice, "a")).await.unwrap();
        service.create_post(post_request(alice, "b")).await.unwrap();

        let feed = service.recent_posts(1, 20).await.unwrap();
        let mine = service.user_posts(alice, 1, 1).await.unwrap();

        assert_eq!(
            feed.value.iter().map(|p| p.content.as_str()).collect::<Vec<_>>(),
            vec!["b", "a"]
        );
        assert_eq!(mine.value.len(), 1);
        assert!(!feed.cache_hit && !mine.cache_hit);
    }
}
