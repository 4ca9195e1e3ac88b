//! API Routes
//!
//! Configures the Axum router with all MiniGram endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, create_post_handler, get_post_handler, get_user_handler,
    health_handler, invalidate_handler, metrics_handler, recent_posts_handler,
    recent_users_handler, register_handler, system_stats_handler, user_posts_handler,
    warm_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health`, `GET /metrics`
/// - `POST|GET /api/users`, `GET /api/users/:id`, `GET /api/users/:id/posts`
/// - `POST|GET /api/posts`, `GET /api/posts/:id`
/// - `GET /api/stats`
/// - `POST /api/cache/warm`, `DELETE /api/cache?pattern=`, `GET /api/cache/stats`
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/users", post(register_handler).get(recent_users_handler))
        .route("/users/:id", get(get_user_handler))
        .route("/users/:id/posts", get(user_posts_handler))
        .route("/posts", post(create_post_handler).get(recent_posts_handler))
        .route("/posts/:id", get(get_post_handler))
        .route("/stats", get(system_stats_handler))
        .route("/cache", delete(invalidate_handler))
        .route("/cache/warm", post(warm_handler))
        .route("/cache/stats", get(cache_stats_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
