//! Cache Key Module
//!
//! Builds sanitized, colon-delimited cache keys.
//!
//! Keys have the shape `prefix:identifier[:params]`. Every character outside
//! `[A-Za-z0-9:_-]` is replaced with `_`, so keys are safe for any backend and
//! never contain glob metacharacters. Two different raw inputs may sanitize to
//! the same key (e.g. `a@b` and `a.b`); that collision is accepted.

// == Prefixes ==
pub const USER_PREFIX: &str = "user";
pub const USER_EMAIL_PREFIX: &str = "user:email";
pub const POST_PREFIX: &str = "post";
pub const RECENT_USERS_PREFIX: &str = "users:recent";
pub const RECENT_POSTS_PREFIX: &str = "posts:recent";
pub const USER_POSTS_PREFIX: &str = "posts:user";
pub const STATS_PREFIX: &str = "stats";

/// Builds a sanitized key from a prefix, identifier and optional parameters.
pub fn key(prefix: &str, identifier: impl std::fmt::Display, params: Option<&str>) -> String {
    let raw = match params {
        Some(params) => format!("{}:{}:{}", prefix, identifier, params),
        None => format!("{}:{}", prefix, identifier),
    };
    sanitize(&raw)
}

/// Builds a glob pattern matching every key under `prefix:identifier:`.
///
/// The components are sanitized first and the `*` is appended afterwards.
pub fn pattern(prefix: &str, identifier: Option<&str>) -> String {
    match identifier {
        Some(identifier) => format!("{}:*", key(prefix, identifier, None)),
        None => format!("{}:*", sanitize(prefix)),
    }
}

/// Replaces every character outside `[A-Za-z0-9:_-]` with `_`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ':' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// == Named key shapes ==

pub fn user_key(user_id: i64) -> String {
    key(USER_PREFIX, user_id, None)
}

pub fn user_email_key(email: &str) -> String {
    key(USER_EMAIL_PREFIX, email.to_lowercase(), None)
}

pub fn post_key(post_id: i64) -> String {
    key(POST_PREFIX, post_id, None)
}

pub fn recent_users_key(limit: i64) -> String {
    key(RECENT_USERS_PREFIX, "limit", Some(&limit.to_string()))
}

pub fn recent_posts_key(page: i64, limit: i64) -> String {
    key(
        RECENT_POSTS_PREFIX,
        "page",
        Some(&format!("{}:limit:{}", page, limit)),
    )
}

pub fn user_posts_key(user_id: i64, page: i64, limit: i64) -> String {
    key(
        USER_POSTS_PREFIX,
        user_id,
        Some(&format!("page:{}:limit:{}", page, limit)),
    )
}

pub fn system_stats_key() -> String {
    key(STATS_PREFIX, "system", None)
}

/// Pattern covering every cached page of recent users.
pub fn recent_users_pattern() -> String {
    pattern(RECENT_USERS_PREFIX, None)
}

/// Pattern covering every cached page of recent posts.
pub fn recent_posts_pattern() -> String {
    pattern(RECENT_POSTS_PREFIX, None)
}

/// Pattern covering every cached page of one user's posts.
pub fn user_posts_pattern(user_id: i64) -> String {
    pattern(USER_POSTS_PREFIX, Some(&user_id.to_string()))
}
