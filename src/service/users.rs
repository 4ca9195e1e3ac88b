//! User registration and lookups.

use tracing::{debug, info};

use super::{Fetched, MiniGram};
use crate::cache::{keys, CacheType};
use crate::error::{AppError, Result};
use crate::models::{NewUser, PublicUser, RegisterRequest};

impl MiniGram {
    // == Register ==
    /// Creates a user.
    ///
    /// A cached `user:email:<email>` entry short-circuits into a conflict; its
    /// absence proves nothing, so the store is asked next and its unique
    /// constraints have the final word.
    pub async fn register(&self, req: RegisterRequest) -> Result<PublicUser> {
        if let Some(msg) = req.validate() {
            return Err(AppError::Validation(msg));
        }

        let username = req.username.trim().to_string();
        let email = req.email.trim().to_lowercase();
        let email_key = keys::user_email_key(&email);

        if self
            .cache
            .get::<PublicUser>(&email_key, CacheType::User)
            .await
            .is_some()
        {
            debug!(email = %email, "registration conflict from cache");
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        if let Some(existing) = self.store.find_user_by_email(&email).await? {
            let existing = PublicUser::from(existing);
            self.cache
                .set(&email_key, &existing, self.policy.user_ttl, CacheType::User)
                .await;
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(req.password, self.password_cost).await?;

        let user = self
            .store
            .insert_user(NewUser {
                username,
                email,
                password_hash,
            })
            .await?;
        let user = PublicUser::from(user);
        info!(user_id = user.id, "user registered");

        self.cache
            .set(
                &keys::user_key(user.id),
                &user,
                self.policy.user_ttl,
                CacheType::User,
            )
            .await;
        self.cache
            .set(&email_key, &user, self.policy.user_ttl, CacheType::User)
            .await;
        self.invalidate_after_write(&[keys::recent_users_pattern()])
            .await;

        Ok(user)
    }

    // == Get User ==
    pub async fn get_user(&self, id: i64) -> Result<Fetched<PublicUser>> {
        self.read_through(
            &keys::user_key(id),
            CacheType::User,
            self.policy.user_ttl,
            || async {
                match self.store.find_user(id).await? {
                    Some(user) => Ok(PublicUser::from(user)),
                    None => Err(AppError::NotFound(format!("User {} not found", id))),
                }
            },
        )
        .await
    }

    // == Recent Users ==
    pub async fn recent_users(&self, limit: i64) -> Result<Fetched<Vec<PublicUser>>> {
        self.read_through(
            &keys::recent_users_key(limit),
            CacheType::Users,
            self.policy.list_ttl,
            || async {
                let users = self.store.recent_users(limit).await?;
                Ok::<_, AppError>(users.into_iter().map(PublicUser::from).collect())
            },
        )
        .await
    }
}

/// bcrypt on the blocking pool; it is deliberately slow.
async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::cache::{KvBackend, MemoryBackend};
    use crate::error::AppError;
    use crate::models::RegisterRequest;
    use crate::store::{MemoryStore, RecordStore};

    fn register_request(name: &str) -> RegisterRequest {
        RegisterRequest {
            username: name.to_string(),
            email: format!("{}@Example.com", name),
            password: "secret123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_populates_cache() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);

        let user = service.register(register_request("alice")).await.unwrap();

        assert_eq!(user.email, "alice@example.com");
        assert!(backend.get("user:1").await.unwrap().is_some());
        assert!(backend
            .get("user:email:alice_example_com")
            .await
            .unwrap()
            .is_some());

        let stored = store.find_user(user.id).await.unwrap().unwrap();
        assert!(bcrypt::verify("secret123", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_invalidates_recent_users_and_stats() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);
        backend.set_ex("users:recent:limit:20", "[]".into(), 60).await.unwrap();
        backend.set_ex("stats:system", "{}".into(), 60).await.unwrap();

        service.register(register_request("alice")).await.unwrap();

        assert!(backend.keys("users:recent:*").await.unwrap().is_empty());
        assert!(backend.get("stats:system").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_validation_touches_nothing() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);

        let err = service
            .register(RegisterRequest {
                username: "".to_string(),
                email: "x@y.z".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.query_count(), 0);
        assert_eq!(service.cache_stats().await.misses, 0);
    }

    #[tokio::test]
    async fn test_register_conflict_from_cache_skips_store() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);
        service.register(register_request("alice")).await.unwrap();
        let queries = store.query_count();

        let err = service
            .register(register_request("alice"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.query_count(), queries);
    }

    #[tokio::test]
    async fn test_register_conflict_from_store_when_cache_is_cold() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);
        service.register(register_request("alice")).await.unwrap();
        backend
            .del(&["user:email:alice_example_com".to_string()])
            .await
            .unwrap();

        let err = service
            .register(register_request("alice"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict_from_store_constraint() {
        let store = MemoryStore::new();
        let service = service(&store, &MemoryBackend::new());
        service.register(register_request("alice")).await.unwrap();

        let err = service
            .register(RegisterRequest {
                username: "alice".to_string(),
                email: "other@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_user_hit_skips_store() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);
        let alice = service.register(register_request("alice")).await.unwrap();
        backend.del(&["user:1".to_string()]).await.unwrap();

        let miss = service.get_user(alice.id).await.unwrap();
        let queries = store.query_count();
        let hit = service.get_user(alice.id).await.unwrap();

        assert!(!miss.cache_hit);
        assert!(hit.cache_hit);
        assert_eq!(hit.value, alice);
        assert_eq!(store.query_count(), queries);
    }

    #[tokio::test]
    async fn test_get_user_missing_is_not_cached() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);

        let err = service.get_user(99).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_recent_users_cached_per_limit() {
        let store = MemoryStore::new();
        let backend = MemoryBackend::new();
        let service = service(&store, &backend);
        service.register(register_request("alice")).await.unwrap();
        service.register(register_request("bob")).await.unwrap();

        let users = service.recent_users(10).await.unwrap();

        assert!(!users.cache_hit);
        assert_eq!(users.value[0].username, "bob");
        assert!(backend.get("users:recent:limit:10").await.unwrap().is_some());
        assert!(service.recent_users(10).await.unwrap().cache_hit);
    }

    #[tokio::test]
    async fn test_register_succeeds_with_failing_cache() {
        let store = MemoryStore::new();
        let service = failing_cache_service(&store);

        let user = service.register(register_request("alice")).await.unwrap();
        let fetched = service.get_user(user.id).await.unwrap();

        assert!(!fetched.cache_hit);
        assert_eq!(fetched.value, user);
    }
}
