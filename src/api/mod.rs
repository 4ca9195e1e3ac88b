//! API Module
//!
//! HTTP handlers and routing for the MiniGram REST API. Cached reads carry an
//! `X-Cache: HIT|MISS` header.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
