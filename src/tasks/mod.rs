//! Background Tasks Module
//!
//! Contains background tasks that run during server operation.
//!
//! # Tasks
//! - Cache warm-up: warms the cache once, shortly after startup
//! - TTL Cleanup: sweeps expired entries out of the in-memory cache backend

mod cleanup;
mod warmup;

pub use cleanup::spawn_cleanup_task;
pub use warmup::spawn_warmup_task;
