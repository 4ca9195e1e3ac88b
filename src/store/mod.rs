//! Store of Record Module
//!
//! The authoritative relational store behind the cache. `PgStore` talks to
//! PostgreSQL; `MemoryStore` keeps the same tables in process for tests and
//! database-less local runs.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewPost, NewUser, Post, PostWithAuthor, SystemStats, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

// == Store Error ==
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(
                    db.constraint()
                        .map(str::to_string)
                        .unwrap_or_else(|| db.message().to_string()),
                )
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Record Store ==
/// Parameterized reads and inserts against the store of record.
///
/// Listings are newest first. `page` is 1-based.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> StoreResult<()>;

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Inserts a user; `StoreError::Conflict` if the username or email exists.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn recent_users(&self, limit: i64) -> StoreResult<Vec<User>>;

    async fn find_post(&self, id: i64) -> StoreResult<Option<PostWithAuthor>>;

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post>;

    async fn recent_posts(&self, page: i64, limit: i64) -> StoreResult<Vec<PostWithAuthor>>;

    async fn user_posts(&self, user_id: i64, page: i64, limit: i64)
        -> StoreResult<Vec<PostWithAuthor>>;

    /// Counts and most recent activity across the whole store.
    async fn system_stats(&self) -> StoreResult<SystemStats>;

    /// Releases pooled connections. Called once on shutdown.
    async fn close(&self) {}
}

/// Row offset of a 1-based page, saturating at `i64::MAX`.
pub(crate) fn page_offset(page: i64, limit: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(limit.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::borrow::Cow;
    use std::error::Error as StdError;

    use sqlx::error::{DatabaseError, ErrorKind};

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(i64::MAX, 20), i64::MAX);
        assert_eq!(page_offset(i64::MIN, 20), 0);
    }

    /// Database error carrying a fixed SQLSTATE, as the Postgres driver reports it.
    #[derive(Debug, Error)]
    #[error("{message}")]
    struct SqlStateError {
        code: &'static str,
        constraint: Option<&'static str>,
        message: &'static str,
    }

    impl DatabaseError for SqlStateError {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                UNIQUE_VIOLATION => ErrorKind::UniqueViolation,
                "23503" => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn database_error(
        code: &'static str,
        constraint: Option<&'static str>,
        message: &'static str,
    ) -> sqlx::Error {
        sqlx::Error::Database(Box::new(SqlStateError {
            code,
            constraint,
            message,
        }))
    }

    #[test]
    fn test_unique_violation_maps_to_conflict_with_constraint() {
        let err = StoreError::from(database_error(
            "23505",
            Some("users_email_key"),
            "duplicate key value violates unique constraint",
        ));

        match err {
            StoreError::Conflict(constraint) => assert_eq!(constraint, "users_email_key"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_unique_violation_without_constraint_uses_message() {
        let err = StoreError::from(database_error("23505", None, "duplicate key"));
        assert!(matches!(err, StoreError::Conflict(msg) if msg == "duplicate key"));
    }

    #[test]
    fn test_other_sqlstate_is_database_error() {
        let err = StoreError::from(database_error(
            "23503",
            Some("posts_user_id_fkey"),
            "insert or update violates foreign key constraint",
        ));
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_non_database_sqlx_error_is_not_conflict() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
