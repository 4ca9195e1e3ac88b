//! API Handlers
//!
//! HTTP request handlers. Each one parses the request, calls into the
//! service and formats the result; cache-aside logic lives in the service.

use axum::{
    extract::{Path, Query, State},
    http::{header::HeaderName, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::cache::WarmReport;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    CacheStatsResponse, CreatePostRequest, HealthResponse, InvalidateQuery, InvalidateResponse,
    PageQuery, PostWithAuthor, PublicUser, RegisterRequest, SystemStats,
};
use crate::service::{Fetched, MiniGram};

/// Response header telling whether the body came from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: MiniGram,
}

impl AppState {
    pub fn new(service: MiniGram) -> Self {
        Self { service }
    }
}

/// `Json` body plus an `X-Cache: HIT|MISS` header.
fn with_cache_header<T: Serialize>(fetched: Fetched<T>) -> impl IntoResponse {
    let marker = if fetched.cache_hit { "HIT" } else { "MISS" };
    ([(X_CACHE, marker)], Json(fetched.value))
}

// == Users ==

/// Handler for POST /api/users
pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>)> {
    let user = state.service.register(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for GET /api/users
pub async fn recent_users_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let users = state.service.recent_users(query.limit()).await?;
    Ok(with_cache_header(users))
}

/// Handler for GET /api/users/:id
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let user = state.service.get_user(id).await?;
    Ok(with_cache_header(user))
}

/// Handler for GET /api/users/:id/posts
pub async fn user_posts_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let posts = state
        .service
        .user_posts(id, query.page(), query.limit())
        .await?;
    Ok(with_cache_header(posts))
}

// == Posts ==

/// Handler for POST /api/posts
pub async fn create_post_handler(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostWithAuthor>)> {
    let post = state.service.create_post(req).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Handler for GET /api/posts
pub async fn recent_posts_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let posts = state
        .service
        .recent_posts(query.page(), query.limit())
        .await?;
    Ok(with_cache_header(posts))
}

/// Handler for GET /api/posts/:id
pub async fn get_post_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let post = state.service.get_post(id).await?;
    Ok(with_cache_header(post))
}

// == Stats and cache administration ==

/// Handler for GET /api/stats
pub async fn system_stats_handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats: Fetched<SystemStats> = state.service.system_stats().await?;
    Ok(with_cache_header(stats))
}

/// Handler for POST /api/cache/warm
pub async fn warm_handler(State(state): State<AppState>) -> Json<WarmReport> {
    Json(state.service.warm().await)
}

/// Handler for DELETE /api/cache?pattern=
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Query(query): Query<InvalidateQuery>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(msg) = query.validate() {
        return Err(AppError::Validation(msg));
    }

    let removed = state.service.invalidate(&query.pattern).await;
    Ok(Json(InvalidateResponse {
        pattern: query.pattern,
        removed,
    }))
}

/// Handler for GET /api/cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let cache = state.service.cache();
    let stats = state.service.cache_stats().await;
    Json(CacheStatsResponse::new(
        stats,
        cache.backend_name(),
        cache.instance(),
    ))
}

// == Operations ==

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let (store_up, cache_up) = state.service.health().await;
    let cache = state.service.cache();
    Json(HealthResponse::new(
        store_up,
        cache_up,
        cache.backend_name(),
        cache.instance(),
    ))
}

/// Handler for GET /metrics
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Some(body) => (StatusCode::OK, body),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}
