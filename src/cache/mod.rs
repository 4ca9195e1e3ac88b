//! Cache Module
//!
//! Cache-aside layer: key namespacing, a fail-open accessor over a pluggable
//! key-value backend, pattern invalidation and cache warming.

mod accessor;
mod backend;
mod entry;
pub mod keys;
mod memory;
mod redis_backend;
mod stats;
pub mod warmer;


// Re-export public types
pub use accessor::{Cache, CacheType, Lookup};
pub use backend::{glob_match, BackendError, BackendResult, KvBackend, UnavailableBackend};
pub use entry::CacheEntry;
pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;
pub use stats::{CacheStats, TypeCounters};
pub use warmer::{CacheWarmer, WarmReport};
