//! MiniGram - a photo-sharing API with a fail-open cache-aside layer
//!
//! PostgreSQL is the store of record; Redis (or an in-process map) caches
//! users, posts, feed pages and system stats in front of it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod service;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::Cache;
pub use config::Config;
pub use service::MiniGram;
pub use tasks::{spawn_cleanup_task, spawn_warmup_task};
