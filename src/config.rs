//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// PostgreSQL URL; the in-memory store is used when unset
    pub database_url: Option<String>,
    /// Upper bound of pooled database connections
    pub database_max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub database_acquire_timeout: u64,
    /// Redis URL; the in-memory cache backend is used when unset
    pub redis_url: Option<String>,
    /// Seconds before a Redis command is abandoned
    pub redis_timeout: u64,
    /// Identity of this instance, attached to every cache metric
    pub instance_id: String,
    /// Interval in seconds between sweeps of the in-memory cache backend
    pub cleanup_interval: u64,
    /// bcrypt work factor for new passwords
    pub bcrypt_cost: u32,
    /// TTLs and warm-set sizes
    pub cache: CachePolicy,
}

/// Cache TTLs and warming limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// TTL in seconds of `user:<id>` and `user:email:<email>` entries
    pub user_ttl: u64,
    /// TTL in seconds of `post:<id>` entries
    pub post_ttl: u64,
    /// TTL in seconds of query-shaped listing pages
    pub list_ttl: u64,
    /// TTL in seconds of `stats:system`
    pub stats_ttl: u64,
    /// Number of most recent users loaded by the warmer
    pub warm_user_limit: i64,
    /// Number of most recent posts loaded by the warmer
    pub warm_post_limit: i64,
    /// Seconds between startup and the first warm run
    pub warm_delay: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            user_ttl: 900,
            post_ttl: 600,
            list_ttl: 300,
            stats_ttl: 60,
            warm_user_limit: 100,
            warm_post_limit: 50,
            warm_delay: 5,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Work factors bcrypt accepts; anything else fails every hash.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Falls back to `default` when `cost` is outside what bcrypt accepts.
fn bcrypt_cost_or(cost: u32, default: u32) -> u32 {
    if BCRYPT_COST_RANGE.contains(&cost) {
        cost
    } else {
        tracing::warn!(cost, default, "BCRYPT_COST out of range, using default");
        default
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DATABASE_URL` - PostgreSQL URL (default: unset, in-memory store)
    /// - `DATABASE_MAX_CONNECTIONS` - pool size (default: 10)
    /// - `DATABASE_ACQUIRE_TIMEOUT` - seconds (default: 5)
    /// - `REDIS_URL` - Redis URL (default: unset, in-memory cache)
    /// - `REDIS_TIMEOUT` - seconds (default: 2)
    /// - `INSTANCE_ID` - instance label (default: `HOSTNAME`, then `local`)
    /// - `CLEANUP_INTERVAL` - seconds (default: 30)
    /// - `BCRYPT_COST` - 4 to 31 (default: 10)
    /// - `CACHE_USER_TTL` / `CACHE_POST_TTL` / `CACHE_LIST_TTL` / `CACHE_STATS_TTL`
    ///   - seconds (defaults: 900 / 600 / 300 / 60)
    /// - `WARM_USER_LIMIT` / `WARM_POST_LIMIT` - (defaults: 100 / 50)
    /// - `WARM_DELAY` - seconds (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let policy = defaults.cache;

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            database_url: env_opt("DATABASE_URL"),
            database_max_connections: env_or(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            database_acquire_timeout: env_or(
                "DATABASE_ACQUIRE_TIMEOUT",
                defaults.database_acquire_timeout,
            ),
            redis_url: env_opt("REDIS_URL"),
            redis_timeout: env_or("REDIS_TIMEOUT", defaults.redis_timeout),
            instance_id: env_opt("INSTANCE_ID")
                .or_else(|| env_opt("HOSTNAME"))
                .unwrap_or(defaults.instance_id),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            bcrypt_cost: bcrypt_cost_or(
                env_or("BCRYPT_COST", defaults.bcrypt_cost),
                defaults.bcrypt_cost,
            ),
            cache: CachePolicy {
                user_ttl: env_or("CACHE_USER_TTL", policy.user_ttl),
                post_ttl: env_or("CACHE_POST_TTL", policy.post_ttl),
                list_ttl: env_or("CACHE_LIST_TTL", policy.list_ttl),
                stats_ttl: env_or("CACHE_STATS_TTL", policy.stats_ttl),
                warm_user_limit: env_or("WARM_USER_LIMIT", policy.warm_user_limit),
                warm_post_limit: env_or("WARM_POST_LIMIT", policy.warm_post_limit),
                warm_delay: env_or("WARM_DELAY", policy.warm_delay),
            },
        }
    }

    pub fn database_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.database_acquire_timeout)
    }

    pub fn redis_timeout(&self) -> Duration {
        Duration::from_secs(self.redis_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            database_url: None,
            database_max_connections: 10,
            database_acquire_timeout: 5,
            redis_url: None,
            redis_timeout: 2,
            instance_id: "local".to_string(),
            cleanup_interval: 30,
            bcrypt_cost: 10,
            cache: CachePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert!(config.database_url.is_none());
        assert!(config.redis_url.is_none());
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.redis_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_cache_policy_defaults() {
        let policy = CachePolicy::default();
        assert_eq!(policy.user_ttl, 900);
        assert_eq!(policy.post_ttl, 600);
        assert_eq!(policy.stats_ttl, 60);
        assert_eq!(policy.warm_user_limit, 100);
        assert_eq!(policy.warm_post_limit, 50);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "SERVER_PORT",
            "DATABASE_URL",
            "REDIS_URL",
            "CACHE_USER_TTL",
            "CACHE_POST_TTL",
            "WARM_USER_LIMIT",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert!(config.database_url.is_none());
        assert!(config.redis_url.is_none());
        assert_eq!(config.cache.user_ttl, 900);
        assert_eq!(config.cache.post_ttl, 600);
        assert_eq!(config.cache.warm_user_limit, 100);
    }

    #[test]
    fn test_bcrypt_cost_out_of_range_falls_back() {
        assert_eq!(bcrypt_cost_or(12, 10), 12);
        assert_eq!(bcrypt_cost_or(4, 10), 4);
        assert_eq!(bcrypt_cost_or(31, 10), 31);
        assert_eq!(bcrypt_cost_or(3, 10), 10);
        assert_eq!(bcrypt_cost_or(32, 10), 10);
        assert_eq!(bcrypt_cost_or(0, 10), 10);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("MINIGRAM_TEST_GARBAGE_PORT", "not-a-number");
        assert_eq!(env_or("MINIGRAM_TEST_GARBAGE_PORT", 42u16), 42);
        env::remove_var("MINIGRAM_TEST_GARBAGE_PORT");
    }
}
