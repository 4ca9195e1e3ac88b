//! Domain records and request/response models for the MiniGram API

pub mod domain;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use domain::{NewPost, NewUser, Post, PostWithAuthor, PublicUser, SystemStats, User};
pub use requests::{CreatePostRequest, InvalidateQuery, PageQuery, RegisterRequest};
pub use responses::{CacheStatsResponse, ErrorResponse, HealthResponse, InvalidateResponse};
