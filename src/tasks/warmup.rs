//! Cache Warm-up Task
//!
//! Warms the cache once, a fixed delay after startup, if the cache backend
//! is reachable by then.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::WarmReport;
use crate::service::MiniGram;

/// Spawns the one-shot startup warm-up.
///
/// The task resolves to `None` when the backend did not answer `PING` and
/// warming was skipped.
pub fn spawn_warmup_task(service: MiniGram, delay: Duration) -> JoinHandle<Option<WarmReport>> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        if !service.cache().is_available().await {
            warn!("Cache backend unreachable, skipping startup warm-up");
            return None;
        }

        info!("Running startup cache warm-up");
        Some(service.warm().await)
    })
}
