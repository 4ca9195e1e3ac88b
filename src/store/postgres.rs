//! PostgreSQL store of record.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;
use tracing::info;

use super::{page_offset, RecordStore, StoreResult};
use crate::models::{NewPost, NewUser, Post, PostWithAuthor, PublicUser, SystemStats, User};

/// Idempotent table bootstrap run on connect.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE TABLE IF NOT EXISTS posts (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    image_url TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_posts_user_id ON posts(user_id);
CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at DESC);
"#;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

const POST_WITH_AUTHOR: &str = "SELECT p.id, p.user_id, u.username, p.content, p.image_url, p.created_at \
     FROM posts p JOIN users u ON u.id = p.user_id";

/// Store of record backed by a bounded PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects the pool and creates the tables if they are missing.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET application_name = 'minigram';").await?;
                    Ok(())
                })
            })
            .connect(url)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!(max_connections, "Connected to PostgreSQL");

        Ok(Self { pool })
    }
}

#[async_trait]
impl RecordStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn recent_users(&self, limit: i64) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC LIMIT $1",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn find_post(&self, id: i64) -> StoreResult<Option<PostWithAuthor>> {
        let sql = format!("{} WHERE p.id = $1", POST_WITH_AUTHOR);
        let post = sqlx::query_as::<_, PostWithAuthor>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let post = sqlx::query_as::<_, Post>(
            "INSERT INTO posts (user_id, content, image_url) VALUES ($1, $2, $3) \
             RETURNING id, user_id, content, image_url, created_at",
        )
        .bind(post.user_id)
        .bind(&post.content)
        .bind(&post.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn recent_posts(&self, page: i64, limit: i64) -> StoreResult<Vec<PostWithAuthor>> {
        let sql = format!(
            "{} ORDER BY p.created_at DESC, p.id DESC LIMIT $1 OFFSET $2",
            POST_WITH_AUTHOR
        );
        let posts = sqlx::query_as::<_, PostWithAuthor>(&sql)
            .bind(limit)
            .bind(page_offset(page, limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn user_posts(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> StoreResult<Vec<PostWithAuthor>> {
        let sql = format!(
            "{} WHERE p.user_id = $1 ORDER BY p.created_at DESC, p.id DESC LIMIT $2 OFFSET $3",
            POST_WITH_AUTHOR
        );
        let posts = sqlx::query_as::<_, PostWithAuthor>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(page_offset(page, limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn system_stats(&self) -> StoreResult<SystemStats> {
        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let total_posts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        let posts_last_24h: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE created_at > NOW() - INTERVAL '24 hours'",
        )
        .fetch_one(&self.pool)
        .await?;

        let latest_user = self.recent_users(1).await?.into_iter().next();
        let latest_post = self.recent_posts(1, 1).await?.into_iter().next();

        Ok(SystemStats {
            total_users,
            total_posts,
            posts_last_24h,
            latest_user: latest_user.map(PublicUser::from),
            latest_post,
            generated_at: chrono::Utc::now(),
        })
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }
}
