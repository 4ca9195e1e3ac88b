//! In-process store of record with the same semantics as the SQL tables:
//! generated ids, unique usernames and emails, newest-first listings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use super::{page_offset, RecordStore, StoreError, StoreResult};
use crate::models::{NewPost, NewUser, Post, PostWithAuthor, PublicUser, SystemStats, User};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
}

/// Store of record kept in memory.
///
/// Counts every query it serves so callers can check how often the store
/// was reached.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    queries: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queries served since creation.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    fn count_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }

    fn with_author(post: &Post, users: &[User]) -> Option<PostWithAuthor> {
        let author = users.iter().find(|user| user.id == post.user_id)?;
        Some(PostWithAuthor {
            id: post.id,
            user_id: post.user_id,
            username: author.username.clone(),
            content: post.content.clone(),
            image_url: post.image_url.clone(),
            created_at: post.created_at,
        })
    }

    fn page<'a, T: 'a>(
        rows: impl DoubleEndedIterator<Item = &'a T>,
        page: i64,
        limit: i64,
    ) -> impl Iterator<Item = &'a T> {
        // Rows are kept in insertion order, so newest first is the reverse.
        rows.rev()
            .skip(page_offset(page, limit).max(0) as usize)
            .take(limit.max(0) as usize)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        self.count_query();
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.count_query();
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|user| user.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        self.count_query();
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("users_username_key".to_string()));
        }
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }

        let user = User {
            id: tables.users.last().map_or(1, |u| u.id + 1),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn recent_users(&self, limit: i64) -> StoreResult<Vec<User>> {
        self.count_query();
        let tables = self.tables.read().await;
        Ok(Self::page(tables.users.iter(), 1, limit).cloned().collect())
    }

    async fn find_post(&self, id: i64) -> StoreResult<Option<PostWithAuthor>> {
        self.count_query();
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|post| post.id == id)
            .and_then(|post| Self::with_author(post, &tables.users)))
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        self.count_query();
        let mut tables = self.tables.write().await;

        let post = Post {
            id: tables.posts.last().map_or(1, |p| p.id + 1),
            user_id: post.user_id,
            content: post.content,
            image_url: post.image_url,
            created_at: Utc::now(),
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn recent_posts(&self, page: i64, limit: i64) -> StoreResult<Vec<PostWithAuthor>> {
        self.count_query();
        let tables = self.tables.read().await;
        Ok(Self::page(tables.posts.iter(), page, limit)
            .filter_map(|post| Self::with_author(post, &tables.users))
            .collect())
    }

    async fn user_posts(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> StoreResult<Vec<PostWithAuthor>> {
        self.count_query();
        let tables = self.tables.read().await;
        let owned: Vec<&Post> = tables
            .posts
            .iter()
            .filter(|post| post.user_id == user_id)
            .collect();
        Ok(Self::page(owned.into_iter(), page, limit)
            .filter_map(|post| Self::with_author(post, &tables.users))
            .collect())
    }

    async fn system_stats(&self) -> StoreResult<SystemStats> {
        self.count_query();
        let tables = self.tables.read().await;
        let since = Utc::now() - Duration::hours(24);

        Ok(SystemStats {
            total_users: tables.users.len() as i64,
            total_posts: tables.posts.len() as i64,
            posts_last_24h: tables
                .posts
                .iter()
                .filter(|post| post.created_at > since)
                .count() as i64,
            latest_user: tables.users.last().map(PublicUser::from),
            latest_post: tables
                .posts
                .last()
                .and_then(|post| Self::with_author(post, &tables.users)),
            generated_at: Utc::now(),
        })
    }
}
