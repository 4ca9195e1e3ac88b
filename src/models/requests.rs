//! Request DTOs for the MiniGram API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

/// Default page size for listings
pub const DEFAULT_LIMIT: i64 = 20;
/// Largest page size a client may ask for
pub const MAX_LIMIT: i64 = 100;
/// Highest page number accepted; keeps `(page - 1) * limit` within `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

const MAX_USERNAME_LENGTH: usize = 50;
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_CONTENT_LENGTH: usize = 2200;

/// Request body for user registration (POST /api/users)
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.username.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty()
        {
            return Some("Username, email and password are required".to_string());
        }
        if self.username.trim().chars().count() > MAX_USERNAME_LENGTH {
            return Some(format!(
                "Username exceeds maximum length of {} characters",
                MAX_USERNAME_LENGTH
            ));
        }
        if !self.email.contains('@') {
            return Some("Email address is invalid".to_string());
        }
        if self.password.len() < MIN_PASSWORD_LENGTH {
            return Some(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ));
        }
        None
    }
}

/// Request body for post creation (POST /api/posts)
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    pub user_id: Option<i64>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CreatePostRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.user_id.is_none() || self.content.trim().is_empty() {
            return Some("user_id and content are required".to_string());
        }
        if self.content.len() > MAX_CONTENT_LENGTH {
            return Some(format!(
                "Content exceeds maximum length of {} characters",
                MAX_CONTENT_LENGTH
            ));
        }
        None
    }
}

/// `?page=&limit=` query for paged listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Page number, clamped to `1..=MAX_PAGE`.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    /// Page size clamped to `1..=MAX_LIMIT`.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// `?pattern=` query for on-demand invalidation (DELETE /api/cache)
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateQuery {
    #[serde(default)]
    pub pattern: String,
}

impl InvalidateQuery {
    pub fn validate(&self) -> Option<String> {
        if self.pattern.trim().is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }
}
